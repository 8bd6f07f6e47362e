//! Ctrl+C handling.
//!
//! A single `AtomicBool` is shared between the signal hook and everything that
//! walks or stats files. Once it is set, walkers stop yielding paths, stat
//! workers skip their remaining files, the interrupted chunk is not ingested,
//! and the inventory build returns
//! [`PipelineError::Interrupted`](crate::pipeline::PipelineError::Interrupted).
//! The process then exits with [`EXIT_CODE_INTERRUPTED`].
//!
//! ```rust,no_run
//! use treehardlink::pipeline::{InventoryBuilder, PipelineConfig};
//! use treehardlink::signal::install_handler;
//!
//! let shutdown = install_handler();
//! let builder = InventoryBuilder::new(PipelineConfig::default())
//!     .with_shutdown_flag(shutdown.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code after Ctrl+C (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared interruption flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no interruption requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag, for walkers and stat workers.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Hook Ctrl+C to a shutdown flag.
///
/// The process-wide hook is registered on the first call only; later calls
/// (several `run_app` invocations in one test binary, say) get the same handler
/// back with its flag cleared. If the hook cannot be registered at all, the
/// returned handler still works for [`ShutdownHandler::request_shutdown`].
pub fn install_handler() -> ShutdownHandler {
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();

        let hooked = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\nInterrupted. Finishing current batch...");
            let _ = stderr.flush();
            log::info!("Shutdown signal received");
        });
        if let Err(e) = hooked {
            log::debug!("Ctrl+C hook not installed: {}", e);
        }
        handler
    });

    handler.reset();
    handler.clone()
}
