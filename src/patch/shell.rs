//! Activation script patching
//!
//! `bin/activate.sh` records the environment root in plain variable
//! assignments (`VIRT_ROOT=...`, `PATH=...`). The script is treated as opaque
//! text and rewritten in one pass.

use std::path::Path;

use super::{patch_text, FormatKind, FormatPatcher, PatchReport};
use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::rewrite::SubstitutionRule;

/// Patcher for POSIX shell scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptPatcher;

impl FormatPatcher for ShellScriptPatcher {
    fn format(&self) -> FormatKind {
        FormatKind::ShellScript
    }

    fn patch(
        &self,
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport> {
        patch_text(fs, file, rule, |_, _| Ok(())).map_err(|e| e.into_patch(file))
    }
}
