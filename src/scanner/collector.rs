//! Metadata collection for enumerated files.
//!
//! [`collect`] turns one absolute path into a [`FileAttributes`] record. It
//! keeps no state between calls and only reads from the filesystem, so it is
//! safe to call from any number of threads at once.
//!
//! Files are statted with `lstat` semantics: a symlink that slipped through
//! enumeration is reported as [`StatError::NotRegularFile`] rather than being
//! followed.

use std::fs::Metadata;
use std::path::Path;

use super::path_utils::relative_path;
use super::{FileAttributes, RelativePathMode, StatError};

/// Stateless stat collector.
///
/// Holds only the options that shape the record; one instance can be shared
/// by every worker thread of a scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collector {
    mode: RelativePathMode,
    follow_symlinks: bool,
}

impl Collector {
    /// Create a collector using the given relative path mode.
    #[must_use]
    pub fn new(mode: RelativePathMode) -> Self {
        Self {
            mode,
            follow_symlinks: false,
        }
    }

    /// Stat through symlinks instead of reporting them as non-regular.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Stat `path` and build its attribute record relative to `root`.
    ///
    /// # Errors
    ///
    /// - [`StatError::NotFound`] if the file vanished after enumeration
    /// - [`StatError::PermissionDenied`] if it can no longer be statted
    /// - [`StatError::NotRegularFile`] if it is no longer a regular file
    /// - [`StatError::OutsideRoot`] if `path` is not under `root`
    /// - [`StatError::Unsupported`] on platforms without inode metadata
    pub fn collect(&self, root: &Path, path: &Path) -> Result<FileAttributes, StatError> {
        let metadata = if self.follow_symlinks {
            std::fs::metadata(path)
        } else {
            std::fs::symlink_metadata(path)
        }
        .map_err(|e| map_io_error(path, e))?;

        if !metadata.is_file() {
            return Err(StatError::NotRegularFile(path.to_path_buf()));
        }

        let relative = relative_path(root, path, self.mode).ok_or_else(|| StatError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

        from_metadata(path, &metadata, relative)
    }
}

/// Stat `path` with `lstat` semantics and build its record relative to `root`.
///
/// Shorthand for `Collector::new(mode).collect(root, path)`.
///
/// # Errors
///
/// See [`Collector::collect`].
pub fn collect(root: &Path, path: &Path, mode: RelativePathMode) -> Result<FileAttributes, StatError> {
    Collector::new(mode).collect(root, path)
}

#[cfg(unix)]
fn from_metadata(
    _path: &Path,
    metadata: &Metadata,
    relative_path: String,
) -> Result<FileAttributes, StatError> {
    use std::os::unix::fs::MetadataExt;

    Ok(FileAttributes {
        inode: metadata.ino(),
        device_id: metadata.dev(),
        mode: metadata.mode(),
        link_count: metadata.nlink(),
        owner_id: metadata.uid(),
        group_id: metadata.gid(),
        size_bytes: metadata.size(),
        modified_time: metadata.mtime(),
        changed_time: metadata.ctime(),
        relative_path,
    })
}

#[cfg(not(unix))]
fn from_metadata(
    path: &Path,
    _metadata: &Metadata,
    _relative_path: String,
) -> Result<FileAttributes, StatError> {
    // Inode numbers and link counts need GetFileInformationByHandle on Windows,
    // which would mean opening every file.
    Err(StatError::Unsupported(path.to_path_buf()))
}

fn map_io_error(path: &Path, error: std::io::Error) -> StatError {
    use std::io::ErrorKind;

    match error.kind() {
        ErrorKind::NotFound => StatError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => StatError::PermissionDenied(path.to_path_buf()),
        _ => StatError::Io {
            path: path.to_path_buf(),
            source: error,
        },
    }
}
