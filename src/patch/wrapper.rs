//! Interpreter wrapper patching
//!
//! `bin/php` is a small script that runs the real interpreter with
//! `-c <root>/etc/php.ini`. It is rewritten as opaque text; its executable
//! bit survives because the write keeps the file's mode.

use std::path::Path;

use log::warn;

use super::{patch_text, FormatKind, FormatPatcher, PatchReport};
use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::rewrite::{occurrences, SubstitutionRule};

/// Location of the interpreter configuration relative to the environment
/// root, as referenced by the wrapper.
pub const CONFIG_REFERENCE: &str = "etc/php.ini";

/// Patcher for the interpreter wrapper script.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapperScriptPatcher;

impl FormatPatcher for WrapperScriptPatcher {
    fn format(&self) -> FormatKind {
        FormatKind::WrapperScript
    }

    fn patch(
        &self,
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport> {
        patch_text(fs, file, rule, |original, _| {
            let reference = format!("{}/{}", rule.from(), CONFIG_REFERENCE);
            if occurrences(original, reference.as_bytes()) == 0 {
                warn!(
                    "{} does not reference {}; rewriting it anyway",
                    file.display(),
                    reference
                );
            }
            Ok(())
        })
        .map_err(|e| e.into_patch(file))
    }
}
