//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display a spinner while a root is enumerated and a bar while its files
//! are statted.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name reported while a root is enumerated.
pub const PHASE_ENUMERATE: &str = "enumerate";
/// Phase name reported while enumerated files are statted and ingested.
pub const PHASE_STAT: &str = "stat";

/// Progress callback for inventory building phases.
///
/// Implement this trait to receive progress updates while roots are
/// enumerated and ingested.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_ENUMERATE`] or [`PHASE_STAT`])
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items processed so far
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}

    /// Called with a status line meant for the user, such as the root
    /// about to be listed.
    fn on_status(&self, _line: &str) {}
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    enumerate: Mutex<Option<ProgressBar>>,
    stat: Mutex<Option<ProgressBar>>,
    prefix: Mutex<String>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use treehardlink::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enumerate: Mutex::new(None),
            stat: Mutex::new(None),
            prefix: Mutex::new(String::new()),
            quiet,
        }
    }

    fn enumerate_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn stat_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} {per_sec} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            PHASE_ENUMERATE => Some(&self.enumerate),
            PHASE_STAT => Some(&self.stat),
            _ => None,
        }
    }

    /// The bar of the most recently started phase still running.
    fn with_active_bar(&self, f: impl FnOnce(&ProgressBar)) {
        for slot in [&self.stat, &self.enumerate] {
            if let Ok(guard) = slot.lock() {
                if let Some(pb) = guard.as_ref() {
                    f(pb);
                    return;
                }
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == PHASE_ENUMERATE {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::enumerate_style());
            pb.set_message("Listing files");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::stat_style());
            pb.set_message("Statting");
            pb
        };

        match self.slot(phase).map(Mutex::lock) {
            Some(Ok(mut slot)) => *slot = Some(pb),
            _ => pb.finish_and_clear(),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let display_msg = match self.prefix.lock() {
            Ok(prefix) if !prefix.is_empty() => format!("{}: {}", *prefix, truncate_path(path, 30)),
            _ => truncate_path(path, 30),
        };

        self.with_active_bar(|pb| {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let finished = match phase {
            PHASE_ENUMERATE => "Listing complete",
            PHASE_STAT => "Statting complete",
            _ => return,
        };
        if let Some(Ok(mut slot)) = self.slot(phase).map(Mutex::lock) {
            if let Some(pb) = slot.take() {
                pb.finish_with_message(finished);
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Ok(mut prefix) = self.prefix.lock() {
            *prefix = message.to_string();
        }
        self.with_active_bar(|pb| pb.set_message(message.to_string()));
    }

    fn on_status(&self, line: &str) {
        if self.quiet {
            return;
        }

        // stdout carries the report.
        self.multi.suspend(|| eprintln!("{line}"));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
