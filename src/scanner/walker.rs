//! Directory walker yielding regular files under one root.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct, the tree enumerator of the
//! inventory pipeline. It uses [`walkdir`] for a single-threaded, depth-first
//! traversal and yields absolute paths of regular files lazily. Calling
//! [`Walker::walk`] again starts a fresh traversal.
//!
//! # Features
//!
//! - Regular files only (directories, symlinks, sockets and devices are skipped)
//! - Deterministic output (children sorted by file name)
//! - Optional symlink following with loop detection from walkdir
//! - Hidden file filtering
//! - Graceful shutdown via atomic flag
//!
//! # Errors
//!
//! A failure on the root itself is yielded as [`EnumerationError::Root`] and
//! ends the walk. Failures deeper in the tree are yielded as
//! [`EnumerationError::Subtree`] and the walk carries on with the siblings.
//!
//! # Example
//!
//! ```no_run
//! use treehardlink::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/snapshots/daily.0"), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::path_utils::absolute_root;
use super::{EnumerationError, WalkerConfig};

/// Directory walker for one snapshot root.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to enumerate; a relative path is resolved
    ///   against the current directory
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: absolute_root(path),
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set to `true`, the walker stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Root this walker enumerates.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk the tree, yielding absolute paths of regular files.
    ///
    /// Errors are yielded as [`EnumerationError`] values rather than stopping
    /// iteration, except for a root failure which is the last item yielded.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, EnumerationError>> + '_ {
        let skip_hidden = self.config.skip_hidden;

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)));

        walk_dir
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    return false;
                }
                true
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        Some(Ok(entry.into_path()))
                    } else {
                        if entry.path_is_symlink() && !self.config.follow_symlinks {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => Some(Err(self.convert_error(e))),
            })
    }

    /// Convert a walkdir error, classifying it by depth.
    fn convert_error(&self, error: walkdir::Error) -> EnumerationError {
        let depth = error.depth();
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        let message = error.to_string();
        let source = error
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other(message));

        if depth == 0 {
            log::error!("Cannot traverse root {}: {}", path.display(), source);
            EnumerationError::Root { path, source }
        } else {
            log::warn!("Skipping unreadable {}: {}", path.display(), source);
            EnumerationError::Subtree { path, source }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
