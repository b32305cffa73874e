//! Filesystem service used by the clone engine
//!
//! The clone pipeline never touches `std::fs` directly. Every primitive it
//! needs goes through the [`Filesystem`] trait so tests can substitute an
//! implementation that fails on demand. [`LocalFs`] is the real implementation.
//!
//! Failures are reported as [`Error::Filesystem`] carrying an
//! [`FsErrorKind`](crate::error::FsErrorKind), which separates "not found",
//! "permission denied" and "already exists" from everything else.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Filesystem primitives with POSIX-like semantics.
pub trait Filesystem {
    /// Create `path`. Missing parents are created; the final component must
    /// not already exist.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Recursively copy the contents of `src` into the existing directory
    /// `dst`, preserving permission bits. Symlinks are recreated, not
    /// followed; absolute link targets inside `src` are re-pointed into
    /// `dst`.
    fn mirror(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Recursively delete `path`. Deleting a path that does not exist
    /// succeeds.
    fn remove_all(&self, path: &Path) -> Result<()>;

    /// Read a whole file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace the contents of `path` without ever exposing a half-written
    /// file, then apply the permission bits `mode`.
    fn write_atomic(&self, path: &Path, content: &[u8], mode: u32) -> Result<()>;

    /// Permission bits of an existing file.
    fn mode(&self, path: &Path) -> Result<u32>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// True if `path` is a directory with no entries.
    fn is_empty_dir(&self, path: &Path) -> Result<bool>;
}

/// [`Filesystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for LocalFs {
    fn create_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs("create_dir", parent, e))?;
        }
        fs::create_dir(path).map_err(|e| Error::fs("create_dir", path, e))
    }

    fn mirror(&self, src: &Path, dst: &Path) -> Result<()> {
        // Directory modes are applied after their contents are written so a
        // read-only directory in the source does not block the copy.
        let mut dir_modes: Vec<(PathBuf, fs::Permissions)> = Vec::new();

        let walker = WalkDir::new(src)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(src).to_path_buf();
                match e.into_io_error() {
                    Some(io) => Error::fs("mirror", &path, io),
                    None => Error::Clone {
                        message: format!("filesystem loop detected at {}", path.display()),
                    },
                }
            })?;
            let rel_path = entry.path().strip_prefix(src).map_err(|_| Error::Clone {
                message: format!("{} is outside {}", entry.path().display(), src.display()),
            })?;
            let new_path = dst.join(rel_path);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&new_path).map_err(|e| Error::fs("mirror", &new_path, e))?;
                let metadata = entry
                    .metadata()
                    .map_err(|e| Error::Clone {
                        message: format!("cannot stat {}: {}", entry.path().display(), e),
                    })?;
                dir_modes.push((new_path, metadata.permissions()));
            } else if file_type.is_symlink() {
                copy_symlink(entry.path(), &new_path, src, dst)?;
            } else if file_type.is_file() {
                // fs::copy carries the permission bits over.
                fs::copy(entry.path(), &new_path).map_err(|e| Error::fs("mirror", entry.path(), e))?;
            } else {
                warn!("Skipping special file {}", entry.path().display());
            }
        }

        for (path, permissions) in dir_modes.into_iter().rev() {
            fs::set_permissions(&path, permissions).map_err(|e| Error::fs("mirror", &path, e))?;
        }

        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(Error::fs("remove", path, e)),
        };
        if metadata.is_dir() {
            // Mirrored trees keep read-only source directories read-only,
            // which would block unlinking their entries.
            make_dirs_writable(path)?;
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
        .map_err(|e| Error::fs("remove", path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::fs("read", path, e))
    }

    fn write_atomic(&self, path: &Path, content: &[u8], mode: u32) -> Result<()> {
        let parent = path.parent().ok_or_else(|| Error::Filesystem {
            operation: "write".to_string(),
            path: path.display().to_string(),
            kind: crate::error::FsErrorKind::Other,
            message: "path has no parent directory".to_string(),
        })?;

        let mut temp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::fs("write", parent, e))?;
        temp.write_all(content)
            .map_err(|e| Error::fs("write", temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::fs("write", temp.path(), e))?;
        set_mode(temp.path(), mode)?;

        temp.persist(path).map_err(|e| Error::fs("write", path, e.error))?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }

    fn mode(&self, path: &Path) -> Result<u32> {
        let metadata = fs::metadata(path).map_err(|e| Error::fs("stat", path, e))?;
        Ok(permission_bits(&metadata))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_empty_dir(&self, path: &Path) -> Result<bool> {
        let mut entries = fs::read_dir(path).map_err(|e| Error::fs("read_dir", path, e))?;
        Ok(entries.next().is_none())
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| Error::fs("chmod", path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Add the owner write bit to every directory under `root`.
#[cfg(unix)]
fn make_dirs_writable(root: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    for entry in WalkDir::new(root).follow_links(false) {
        // Entries we cannot reach are left for remove_dir_all to report.
        let Ok(entry) = entry else { continue };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        let mode = metadata.permissions().mode();
        if mode & 0o200 == 0 {
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode | 0o200))
                .map_err(|e| Error::fs("remove", entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_dirs_writable(_root: &Path) -> Result<()> {
    Ok(())
}

/// Recreate the symlink at `link` under `dst`, re-pointing absolute targets
/// that live inside `src`.
#[cfg(unix)]
fn copy_symlink(link: &Path, new_path: &Path, src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(link).map_err(|e| Error::fs("read_link", link, e))?;
    let relinked = target
        .strip_prefix(src)
        .ok()
        .filter(|_| target.is_absolute())
        .map(|inside| dst.join(inside));
    let target = relinked.unwrap_or(target);
    std::os::unix::fs::symlink(&target, new_path).map_err(|e| Error::fs("symlink", new_path, e))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, _new_path: &Path, _src: &Path, _dst: &Path) -> Result<()> {
    Err(Error::Clone {
        message: format!("cannot copy symlink {} on this platform", link.display()),
    })
}
