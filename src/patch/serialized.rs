//! Package-manager configuration patching
//!
//! `etc/pear.conf` is a PHP `serialize()`d nested array, so a blind text
//! replacement would corrupt the `s:<len>:` length prefixes whenever the new
//! root differs in length. The file is decoded, every string leaf is
//! rewritten, and the document is encoded again with fresh lengths.

use std::path::Path;

use super::{write_if_changed, FormatKind, FormatPatcher, PatchReport};
use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::rewrite::{rewrite_structured, structured_occurrences, SubstitutionRule};
use crate::serialized::Document;

/// Patcher for serialized package-manager configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedConfigPatcher;

impl SerializedConfigPatcher {
    fn patch_inner(
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport> {
        let original = fs.read(file)?;
        let mut document = Document::parse(&original)?;
        let replacements = structured_occurrences(&document.value, rule.from().as_bytes());

        document.value = rewrite_structured(document.value, rule);
        let patched = document.to_bytes();

        write_if_changed(fs, file, &original, &patched, replacements)
    }
}

impl FormatPatcher for SerializedConfigPatcher {
    fn format(&self) -> FormatKind {
        FormatKind::SerializedConfig
    }

    fn patch(
        &self,
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport> {
        Self::patch_inner(fs, file, rule).map_err(|e| e.into_patch(file))
    }
}
