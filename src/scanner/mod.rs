//! Scanner module for tree enumeration and metadata collection.
//!
//! This module provides functionality for:
//! - Lazy directory walking filtered to regular files
//! - Per-file stat collection into [`FileAttributes`]
//! - Root-relative path computation
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`collector`]: Stat collection for a single path
//! - [`path_utils`]: Root prefix removal in both supported modes
//!
//! # Example
//!
//! ```no_run
//! use treehardlink::scanner::{collect, RelativePathMode, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let root = Path::new("/snapshots/daily.0");
//! let walker = Walker::new(root, WalkerConfig::default());
//! for entry in walker.walk() {
//!     let path = match entry {
//!         Ok(path) => path,
//!         Err(e) => {
//!             eprintln!("Warning: {}", e);
//!             continue;
//!         }
//!     };
//!     match collect(root, &path, RelativePathMode::StripPrefix) {
//!         Ok(attrs) => println!("{} -> inode {}", attrs.relative_path, attrs.inode),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod collector;
pub mod path_utils;
pub mod walker;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use collector::{collect, Collector};
pub use walker::Walker;

/// Attribute record for one observed file.
///
/// Produced by the collector for every enumerated path and handed to the
/// inventory store, which keeps the first one it sees per inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    /// Inode number (unique per device)
    pub inode: u64,
    /// Device the inode lives on
    pub device_id: u64,
    /// Raw `st_mode` bits
    pub mode: u32,
    /// Number of hardlinks reported by the filesystem
    pub link_count: u64,
    /// Owning user id
    pub owner_id: u32,
    /// Owning group id
    pub group_id: u32,
    /// File size in bytes
    pub size_bytes: u64,
    /// Modification time, seconds since the Unix epoch
    pub modified_time: i64,
    /// Status change time, seconds since the Unix epoch
    pub changed_time: i64,
    /// Path relative to the root it was enumerated under
    pub relative_path: String,
}

impl FileAttributes {
    /// Create an attribute record with only the fields the analyzer groups on.
    ///
    /// Everything else gets neutral values (`mode` of a 0644 regular file,
    /// one link, zero ids and timestamps). Handy for building inventories
    /// without touching the filesystem.
    #[must_use]
    pub fn new(inode: u64, relative_path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            inode,
            device_id: 0,
            mode: 0o100_644,
            link_count: 1,
            owner_id: 0,
            group_id: 0,
            size_bytes,
            modified_time: 0,
            changed_time: 0,
            relative_path: relative_path.into(),
        }
    }

    /// Set the link count.
    #[must_use]
    pub fn with_link_count(mut self, link_count: u64) -> Self {
        self.link_count = link_count;
        self
    }
}

/// How the root prefix is removed from an enumerated path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RelativePathMode {
    /// Component-wise prefix removal; trailing slashes on the root don't matter.
    #[default]
    StripPrefix,
    /// Drop as many bytes as the root string has, the way older stores were built.
    ByteSlice,
}

impl std::fmt::Display for RelativePathMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelativePathMode::StripPrefix => write!(f, "strip-prefix"),
            RelativePathMode::ByteSlice => write!(f, "byte-slice"),
        }
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May revisit the same inode through several names.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(follow_symlinks: bool, skip_hidden: bool) -> Self {
        Self {
            follow_symlinks,
            skip_hidden,
        }
    }
}

/// Errors from tree enumeration.
#[derive(thiserror::Error, Debug)]
pub enum EnumerationError {
    /// The root itself could not be traversed. Fatal for that root.
    #[error("Cannot traverse root {path}: {source}")]
    Root {
        /// Root being walked
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A directory below the root could not be read. Its subtree is skipped.
    #[error("Cannot read {path}: {source}")]
    Subtree {
        /// Directory or entry where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl EnumerationError {
    /// Whether this error ends the walk of the whole root.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, EnumerationError::Root { .. })
    }
}

/// Errors that can occur while statting a single file.
#[derive(thiserror::Error, Debug)]
pub enum StatError {
    /// The file vanished between enumeration and stat.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when statting the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path no longer names a regular file.
    #[error("Not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// The path is not located under the root it was enumerated for.
    #[error("{path} is not under root {root}")]
    OutsideRoot {
        /// Enumerated path
        path: PathBuf,
        /// Root it was supposed to be under
        root: PathBuf,
    },

    /// Inode metadata is not available on this platform.
    #[error("Inode metadata unavailable on this platform: {0}")]
    Unsupported(PathBuf),

    /// Any other I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}
