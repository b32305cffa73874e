//! Environment descriptions
//!
//! An [`Environment`] pairs the root of an existing environment with the
//! root a clone of it will occupy. [`EnvLayout`] lists the files inside an
//! environment that embed its root and therefore need patching.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::patch::{FormatKind, PatchTarget};
use crate::rewrite::SubstitutionRule;

/// One clone request: where to copy from and where to copy to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    source_root: PathBuf,
    target_root: PathBuf,
    name: String,
    rule: SubstitutionRule,
}

impl Environment {
    /// Build an environment from two absolute paths.
    ///
    /// Both paths end up embedded in text files, so both must be valid
    /// UTF-8. No filesystem checks are made; see [`Environment::resolve`] for
    /// that.
    pub fn new(source_root: impl Into<PathBuf>, target_root: impl Into<PathBuf>) -> Result<Self> {
        let source_root = source_root.into();
        let target_root = target_root.into();

        for path in [&source_root, &target_root] {
            if !path.is_absolute() {
                return Err(Error::Clone {
                    message: format!("path must be absolute: {}", path.display()),
                });
            }
        }
        if target_root.starts_with(&source_root) {
            return Err(Error::Clone {
                message: format!(
                    "cannot clone {} into itself ({})",
                    source_root.display(),
                    target_root.display()
                ),
            });
        }

        let name = target_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Clone {
                message: format!("target has no name: {}", target_root.display()),
            })?;

        let rule = SubstitutionRule::for_roots(&source_root, &target_root)?;

        Ok(Self {
            source_root,
            target_root,
            name,
            rule,
        })
    }

    /// Resolve a user-supplied source and target into absolute paths.
    ///
    /// The source must be an existing directory and is canonicalized. A
    /// relative target is taken relative to `base`; its parent is
    /// canonicalized when it exists so both roots use the same spelling.
    pub fn resolve(source: &Path, target: &Path, base: &Path) -> Result<Self> {
        let source_root = fs::canonicalize(base.join(source)).map_err(|e| Error::Clone {
            message: format!("source environment {}: {}", source.display(), e),
        })?;
        if !source_root.is_dir() {
            return Err(Error::Clone {
                message: format!(
                    "source environment is not a directory: {}",
                    source_root.display()
                ),
            });
        }

        let target_root = normalize(&base.join(target));
        let target_root = match (target_root.parent(), target_root.file_name()) {
            (Some(parent), Some(name)) if parent.is_dir() => fs::canonicalize(parent)
                .map(|parent| parent.join(name))
                .unwrap_or(target_root),
            _ => target_root,
        };

        Self::new(source_root, target_root)
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// The new environment's name (last component of its root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The substitution mapping the source root onto the target root.
    pub fn rule(&self) -> &SubstitutionRule {
        &self.rule
    }
}

/// Remove `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Files inside an environment that embed its root path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvLayout {
    pub activate_script: PatchTarget,
    pub interpreter_config: PatchTarget,
    pub interpreter_wrapper: PatchTarget,
    pub package_config: PatchTarget,
}

impl EnvLayout {
    /// The layout every environment uses.
    pub fn standard() -> Self {
        Self {
            activate_script: PatchTarget::new("bin/activate.sh", FormatKind::ShellScript),
            interpreter_config: PatchTarget::new("etc/php.ini", FormatKind::Ini),
            interpreter_wrapper: PatchTarget::new("bin/php", FormatKind::WrapperScript),
            package_config: PatchTarget::new("etc/pear.conf", FormatKind::SerializedConfig),
        }
    }
}

impl Default for EnvLayout {
    fn default() -> Self {
        Self::standard()
    }
}
