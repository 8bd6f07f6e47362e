//! Inventory building: enumerate, stat and ingest every root.
//!
//! # Overview
//!
//! [`InventoryBuilder`] drives the one-way flow
//! `Walker → Collector → InventoryStore` over the configured roots:
//!
//! 1. **Validate** - every root must exist before anything is statted
//! 2. **Enumerate** - walk one root into a list of regular files
//! 3. **Stat** - collect attributes on a rayon pool of `stat_threads` workers
//! 4. **Ingest** - upsert each chunk of attributes in one transaction
//!
//! Roots are processed one after the other; the store is only queried once
//! all of them are in.
//!
//! # Errors
//!
//! - A missing root aborts the build before any file is statted.
//! - A root that cannot be traversed is recorded in the summary and skipped.
//! - Files that vanish or cannot be statted are logged and skipped.
//! - Store failures abort the build.
//!
//! Relative roots are resolved against the current directory, so stored roots
//! and walked paths are always absolute.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::inventory::{InventoryStore, StoreError};
use crate::progress::{ProgressCallback, PHASE_ENUMERATE, PHASE_STAT};
use crate::scanner::path_utils::absolute_root;
use crate::scanner::{Collector, FileAttributes, RelativePathMode, StatError, Walker, WalkerConfig};

/// Number of stat results ingested per transaction.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Configuration for building an inventory.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads for stat collection; 1 stats sequentially.
    pub stat_threads: usize,
    /// How relative paths are derived from each root.
    pub relative_path_mode: RelativePathMode,
    /// Walker options shared by every root.
    pub walker_config: WalkerConfig,
    /// Stat results per ingest transaction.
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stat_threads: 4,
            relative_path_mode: RelativePathMode::default(),
            walker_config: WalkerConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Set the number of stat worker threads (at least 1).
    #[must_use]
    pub fn with_stat_threads(mut self, threads: usize) -> Self {
        self.stat_threads = threads.max(1);
        self
    }

    /// Set the relative path mode.
    #[must_use]
    pub fn with_relative_path_mode(mut self, mode: RelativePathMode) -> Self {
        self.relative_path_mode = mode;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the ingest batch size (at least 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}

/// Errors that abort an inventory build.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// A configured root does not exist.
    #[error("Directory not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The build was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Inventory build interrupted by user")]
    Interrupted,

    /// The stat worker pool could not be started.
    #[error("Cannot start stat workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The inventory store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of ingesting one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootReport {
    /// Root as given
    pub root: PathBuf,
    /// Regular files enumerated
    pub files_enumerated: usize,
    /// Files statted and ingested
    pub files_ingested: usize,
    /// Ingested files whose inode had not been seen before
    pub new_inodes: usize,
    /// Files skipped because they could not be statted
    pub stat_errors: usize,
    /// Subtrees skipped because they could not be read
    pub subtree_errors: usize,
    /// Why the root could not be traversed, if it could not
    pub failure: Option<String>,
}

impl RootReport {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Self::default()
        }
    }

    /// Whether enumeration of the root itself failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Totals of an inventory build.
#[derive(Debug, Clone, Default)]
pub struct InventorySummary {
    /// Per-root outcomes, in processing order
    pub roots: Vec<RootReport>,
    /// Distinct inodes in the store afterwards
    pub distinct_inodes: u64,
    /// Devices the ingested files live on
    pub device_ids: BTreeSet<u64>,
    /// Wall time of the build
    pub duration: Duration,
}

impl InventorySummary {
    /// Files ingested across all roots.
    #[must_use]
    pub fn files_ingested(&self) -> usize {
        self.roots.iter().map(|r| r.files_ingested).sum()
    }

    /// Files skipped for stat errors across all roots.
    #[must_use]
    pub fn stat_errors(&self) -> usize {
        self.roots.iter().map(|r| r.stat_errors).sum()
    }

    /// Subtrees skipped across all roots.
    #[must_use]
    pub fn subtree_errors(&self) -> usize {
        self.roots.iter().map(|r| r.subtree_errors).sum()
    }

    /// Roots that could not be traversed.
    #[must_use]
    pub fn failed_roots(&self) -> Vec<&Path> {
        self.roots
            .iter()
            .filter(|r| r.failed())
            .map(|r| r.root.as_path())
            .collect()
    }

    /// Whether the ingested inodes span more than one device.
    #[must_use]
    pub fn spans_devices(&self) -> bool {
        self.device_ids.len() > 1
    }
}

/// Check that every root exists.
///
/// # Errors
///
/// Returns [`PipelineError::RootNotFound`] naming the first missing root.
pub fn validate_roots(roots: &[PathBuf]) -> Result<(), PipelineError> {
    match roots.iter().find(|root| !root.exists()) {
        Some(missing) => Err(PipelineError::RootNotFound(missing.clone())),
        None => Ok(()),
    }
}

/// Builds an inventory from a list of roots.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use treehardlink::inventory::InventoryStore;
/// use treehardlink::pipeline::{InventoryBuilder, PipelineConfig};
///
/// let store = InventoryStore::open_in_memory().unwrap();
/// let builder = InventoryBuilder::new(PipelineConfig::default().with_stat_threads(8));
///
/// let roots = vec![PathBuf::from("/snapshots/daily.0"), PathBuf::from("/snapshots/daily.1")];
/// let summary = builder.build(&roots, &store).unwrap();
/// println!("{} distinct inodes", summary.distinct_inodes);
/// ```
pub struct InventoryBuilder {
    config: PipelineConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for InventoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryBuilder")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl InventoryBuilder {
    /// Create a builder with the given configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn status(&self, line: &str) {
        log::debug!("{}", line);
        if let Some(ref callback) = self.progress_callback {
            callback.on_status(line);
        }
    }

    /// Ingest every root into `store`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RootNotFound`] if any root is missing; nothing is
    ///   statted in that case
    /// - [`PipelineError::Interrupted`] if the shutdown flag is raised
    /// - [`PipelineError::Store`] if the store fails
    pub fn build(
        &self,
        roots: &[PathBuf],
        store: &InventoryStore,
    ) -> Result<InventorySummary, PipelineError> {
        let start_time = Instant::now();
        validate_roots(roots)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.stat_threads.max(1))
            .thread_name(|i| format!("stat-{i}"))
            .build()?;
        let collector = Collector::new(self.config.relative_path_mode)
            .with_follow_symlinks(self.config.walker_config.follow_symlinks);

        let mut summary = InventorySummary::default();
        for root in roots {
            if self.is_shutdown_requested() {
                return Err(PipelineError::Interrupted);
            }
            let report = self.ingest_root(root, store, &pool, collector, &mut summary.device_ids)?;
            summary.roots.push(report);
        }

        if summary.spans_devices() {
            log::warn!(
                "Roots span {} devices; inode numbers are only unique per device and are not \
                 told apart across them",
                summary.device_ids.len()
            );
        }

        summary.distinct_inodes = store.len()?;
        summary.duration = start_time.elapsed();
        log::info!(
            "Inventory built: {} files, {} distinct inodes, {} stat errors in {:.2?}",
            summary.files_ingested(),
            summary.distinct_inodes,
            summary.stat_errors(),
            summary.duration
        );
        Ok(summary)
    }

    fn ingest_root(
        &self,
        root: &Path,
        store: &InventoryStore,
        pool: &rayon::ThreadPool,
        collector: Collector,
        device_ids: &mut BTreeSet<u64>,
    ) -> Result<RootReport, PipelineError> {
        let mut report = RootReport::new(root);
        let root = absolute_root(root);
        let root = root.as_path();
        let root_label = root.to_string_lossy();

        self.status(&format!("Getting file list of {}...", root_label));
        let paths = self.enumerate(root, &mut report);
        if self.is_shutdown_requested() {
            return Err(PipelineError::Interrupted);
        }
        if report.failed() {
            return Ok(report);
        }

        self.status(&format!("Statting files in dir {}...", root_label));
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_STAT, paths.len());
        }

        for chunk in paths.chunks(self.config.batch_size.max(1)) {
            if self.is_shutdown_requested() {
                return Err(PipelineError::Interrupted);
            }

            let shutdown = self.shutdown_flag.as_deref();
            let results: Vec<Option<Result<FileAttributes, StatError>>> = pool.install(|| {
                chunk
                    .par_iter()
                    .map(|p| {
                        let stop = shutdown.is_some_and(|f| f.load(Ordering::SeqCst));
                        (!stop).then(|| collector.collect(root, p))
                    })
                    .collect()
            });
            // Nothing of an interrupted chunk is ingested.
            if self.is_shutdown_requested() {
                return Err(PipelineError::Interrupted);
            }

            let mut batch = Vec::with_capacity(results.len());
            for result in results.into_iter().flatten() {
                match result {
                    Ok(attrs) => batch.push(attrs),
                    Err(e) => {
                        log::warn!("Skipping file: {}", e);
                        report.stat_errors += 1;
                    }
                }
            }

            device_ids.extend(batch.iter().map(|a| a.device_id));
            report.new_inodes += store.ingest_batch(&root_label, &batch)?;
            report.files_ingested += batch.len();

            if let Some(ref callback) = self.progress_callback {
                for attrs in &batch {
                    callback.on_item_completed(attrs.size_bytes);
                }
                if let Some(last) = chunk.last() {
                    callback.on_progress(
                        report.files_ingested + report.stat_errors,
                        &last.to_string_lossy(),
                    );
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_STAT);
        }
        log::debug!(
            "{}: {} files ingested, {} new inodes, {} skipped",
            root_label,
            report.files_ingested,
            report.new_inodes,
            report.stat_errors
        );
        Ok(report)
    }

    fn enumerate(&self, root: &Path, report: &mut RootReport) -> Vec<PathBuf> {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_ENUMERATE, 0);
        }

        let mut walker = Walker::new(root, self.config.walker_config.clone());
        if let Some(ref flag) = self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }

        let mut paths = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(path) => {
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(paths.len() + 1, &path.to_string_lossy());
                    }
                    paths.push(path);
                }
                Err(e) if e.is_fatal() => {
                    report.failure = Some(e.to_string());
                    break;
                }
                Err(_) => report.subtree_errors += 1,
            }
        }
        report.files_enumerated = paths.len();

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_ENUMERATE);
        }
        paths
    }
}
