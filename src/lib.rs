//! treehardlink - Hardlink candidate finder for snapshot trees
//!
//! Inventories every regular file under a set of snapshot roots into a SQLite
//! store keyed by inode, then reports distinct inodes that share a relative
//! path and/or size. Those are candidates for being merged into hardlinks;
//! contents are never compared, so candidates need verifying before use.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::DuplicateAnalyzer;
use crate::error::ExitCode;
use crate::inventory::InventoryStore;
use crate::pipeline::{validate_roots, InventoryBuilder};
use crate::progress::{Progress, ProgressCallback};

/// Run the application, writing the report to stdout.
///
/// # Errors
///
/// Returns an error if configuration, a root, the store or the report fails.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_app_with_output(&cli, &mut out)
}

/// Run the application, writing the report to `out`.
///
/// # Errors
///
/// Returns an error if configuration, a root, the store or the report fails.
pub fn run_app_with_output<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet, cli.no_color);
    let handler = signal::install_handler();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.apply_cli(cli);

    // Before the store is recreated, so a typo does not wipe the last inventory.
    validate_roots(&cli.dirs)?;

    let store = InventoryStore::open(&config.database_path)?;
    let progress = Arc::new(Progress::new(cli.quiet));

    let summary = InventoryBuilder::new(config.pipeline_config())
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress.clone())
        .build(&cli.dirs, &store)?;

    for report in summary.roots.iter().filter(|r| r.failed()) {
        log::error!(
            "Skipped {}: {}",
            report.root.display(),
            report.failure.as_deref().unwrap_or("cannot be traversed")
        );
    }
    if summary.stat_errors() > 0 || summary.subtree_errors() > 0 {
        log::warn!(
            "{} files and {} directories could not be read",
            summary.stat_errors(),
            summary.subtree_errors()
        );
    }

    progress.on_status("Applying indexes...");
    store.finalize_indexes()?;

    let analyzer_config = config.analyzer_config();
    let groups = DuplicateAnalyzer::new(analyzer_config).find_candidates(&store)?;
    output::write_report(config.output, &groups, &analyzer_config, out)
        .context("Failed to write report")?;
    out.flush().context("Failed to write report")?;

    let anomalies = store.link_anomalies()?;
    if !anomalies.is_empty() {
        log::warn!(
            "{} inodes were seen more often than their link count; roots may overlap",
            anomalies.len()
        );
    }
    let external = store.external_links()?;
    if !external.is_empty() {
        log::info!(
            "{} inodes have links outside the scanned directories",
            external.len()
        );
    }

    progress.on_status("Done.");
    store.close()?;

    if summary.failed_roots().is_empty() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::GeneralError)
    }
}
