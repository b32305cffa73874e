//! Format-aware path patching
//!
//! A cloned environment carries absolute paths in four kinds of files. Each
//! kind has its own patcher that knows how to read the file, where the paths
//! live in it, and how to write it back without breaking the format. All of
//! them delegate the actual substitution to [`crate::rewrite`].
//!
//! ## Supported Formats
//!
//! - Shell script (shell.rs) - the activation script, opaque text
//! - INI (ini.rs) - the interpreter configuration, validated as INI
//! - Wrapper script (wrapper.rs) - the interpreter wrapper, opaque text
//! - Serialized config (serialized.rs) - PEAR's `serialize()`d configuration
//!
//! Every patcher writes through [`Filesystem::write_atomic`], keeping the
//! file's permission bits, and skips the write when nothing changed.

pub mod ini;
pub mod serialized;
pub mod shell;
pub mod wrapper;

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::error::Result;
use crate::filesystem::Filesystem;
use crate::rewrite::{occurrences, rewrite, SubstitutionRule};

pub use self::ini::IniPatcher;
pub use self::serialized::SerializedConfigPatcher;
pub use self::shell::ShellScriptPatcher;
pub use self::wrapper::WrapperScriptPatcher;

/// The file formats that carry environment paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    ShellScript,
    Ini,
    WrapperScript,
    SerializedConfig,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatKind::ShellScript => "shell script",
            FormatKind::Ini => "INI",
            FormatKind::WrapperScript => "wrapper script",
            FormatKind::SerializedConfig => "serialized config",
        };
        f.write_str(name)
    }
}

/// A file inside an environment that must be patched after copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchTarget {
    /// Path relative to the environment root.
    pub relative_path: PathBuf,
    pub format: FormatKind,
}

impl PatchTarget {
    pub fn new(relative_path: impl Into<PathBuf>, format: FormatKind) -> Self {
        Self {
            relative_path: relative_path.into(),
            format,
        }
    }
}

/// What a single patch did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub file: PathBuf,
    /// Number of path occurrences replaced.
    pub replacements: usize,
    /// Whether the file was rewritten on disk.
    pub changed: bool,
}

/// Rewrites the environment paths inside one kind of file.
pub trait FormatPatcher {
    /// The format this patcher understands.
    fn format(&self) -> FormatKind;

    /// Apply `rule` to `file` in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Patch`](crate::error::Error::Patch) if the file is
    /// missing, unreadable, not valid for this format, or cannot be written.
    fn patch(
        &self,
        fs: &dyn Filesystem,
        file: &Path,
        rule: &SubstitutionRule,
    ) -> Result<PatchReport>;
}

/// The patcher responsible for `format`.
pub fn patcher_for(format: FormatKind) -> Box<dyn FormatPatcher> {
    match format {
        FormatKind::ShellScript => Box::new(ShellScriptPatcher),
        FormatKind::Ini => Box::new(IniPatcher),
        FormatKind::WrapperScript => Box::new(WrapperScriptPatcher),
        FormatKind::SerializedConfig => Box::new(SerializedConfigPatcher),
    }
}

/// Literal whole-file rewrite shared by the text formats.
///
/// `check` sees the original and the rewritten bytes and may reject either.
pub(crate) fn patch_text<F>(
    fs: &dyn Filesystem,
    file: &Path,
    rule: &SubstitutionRule,
    check: F,
) -> Result<PatchReport>
where
    F: FnOnce(&[u8], &[u8]) -> Result<()>,
{
    let original = fs.read(file)?;
    let replacements = occurrences(&original, rule.from().as_bytes());
    let patched = rewrite(&original, rule);
    check(&original, &patched)?;
    write_if_changed(fs, file, &original, &patched, replacements)
}

/// Write `patched` over `file` unless it equals `original`, keeping the
/// file's mode.
pub(crate) fn write_if_changed(
    fs: &dyn Filesystem,
    file: &Path,
    original: &[u8],
    patched: &[u8],
    replacements: usize,
) -> Result<PatchReport> {
    let changed = original != patched;
    if changed {
        let mode = fs.mode(file)?;
        fs.write_atomic(file, patched, mode)?;
    }
    debug!(
        "Patched {}: {} replacement(s){}",
        file.display(),
        replacements,
        if changed { "" } else { ", unchanged" }
    );
    Ok(PatchReport {
        file: file.to_path_buf(),
        replacements,
        changed,
    })
}
