//! Directory tree copy
//!
//! [`DirectoryCloner`] copies an environment's whole tree into a new root.
//! The copy is deep: symlinks are never followed, they are recreated, and
//! absolute link targets that point into the source tree are re-pointed into
//! the destination. A clone therefore never shares files with its origin.

use std::path::Path;

use log::info;

use crate::error::{Error, FsErrorKind, Result};
use crate::filesystem::Filesystem;

/// Copies a source tree into a destination directory.
pub struct DirectoryCloner<'a> {
    fs: &'a dyn Filesystem,
}

impl<'a> DirectoryCloner<'a> {
    pub fn new(fs: &'a dyn Filesystem) -> Self {
        Self { fs }
    }

    /// Copy everything under `source` into `destination`.
    ///
    /// `destination` is created if missing; an existing destination must be
    /// an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Clone`] if the source is missing, not a directory or
    /// unreadable, if the destination is occupied, or if copying fails.
    pub fn clone_tree(&self, source: &Path, destination: &Path) -> Result<()> {
        if !self.fs.exists(source) {
            return Err(Error::Clone {
                message: format!("source {} does not exist", source.display()),
            });
        }
        if !self.fs.is_dir(source) {
            return Err(Error::Clone {
                message: format!("source {} is not a directory", source.display()),
            });
        }

        if self.fs.exists(destination) {
            let empty = self.fs.is_dir(destination)
                && self.fs.is_empty_dir(destination).map_err(clone_error)?;
            if !empty {
                return Err(Error::Clone {
                    message: format!(
                        "destination {} already exists and is not empty",
                        destination.display()
                    ),
                });
            }
        } else {
            self.fs.create_dir(destination).map_err(clone_error)?;
        }

        info!(
            "Copying {} to {}",
            source.display(),
            destination.display()
        );
        self.fs.mirror(source, destination).map_err(clone_error)
    }
}

fn clone_error(err: Error) -> Error {
    match err {
        Error::Clone { .. } => err,
        other => {
            let hint = match other.fs_kind() {
                Some(FsErrorKind::PermissionDenied) => " (check read permissions on the source)",
                _ => "",
            };
            Error::Clone {
                message: format!("{}{}", other, hint),
            }
        }
    }
}
