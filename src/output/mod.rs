//! Report formatters for duplicate candidate groups.
//!
//! - Text for reading in the terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```
//! use treehardlink::duplicates::{AnalyzerConfig, DuplicateAnalyzer};
//! use treehardlink::inventory::InventoryStore;
//! use treehardlink::output::{write_report, OutputFormat};
//!
//! let store = InventoryStore::open_in_memory().unwrap();
//! let config = AnalyzerConfig::default();
//! let groups = DuplicateAnalyzer::new(config).find_candidates(&store).unwrap();
//!
//! let mut out = Vec::new();
//! write_report(OutputFormat::Json, &groups, &config, &mut out).unwrap();
//! assert!(!out.is_empty());
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::duplicates::{AnalyzerConfig, DuplicateGroup};

// Re-export main types
pub use self::csv::{CsvOutput, CsvOutputError};
pub use self::json::{JsonOutput, JsonOutputError};
pub use self::text::TextOutput;

/// Report format for the candidate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
    /// One CSV row per member
    Csv,
    /// No report
    None,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::None => write!(f, "none"),
        }
    }
}

/// Errors while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// Text output failed
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output failed
    #[error(transparent)]
    Json(#[from] JsonOutputError),

    /// CSV output failed
    #[error(transparent)]
    Csv(#[from] CsvOutputError),
}

/// Write `groups` to `writer` in `format`.
///
/// # Errors
///
/// Returns [`OutputError`] if formatting or writing fails.
pub fn write_report<W: Write>(
    format: OutputFormat,
    groups: &[DuplicateGroup],
    config: &AnalyzerConfig,
    writer: &mut W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(groups, config).write_to(writer)?,
        OutputFormat::Json => JsonOutput::new(groups, config).write_to(writer, true)?,
        OutputFormat::Csv => CsvOutput::new(groups).write_to(writer)?,
        OutputFormat::None => {}
    }
    Ok(())
}
