//! Duplicate candidate detection module.
//!
//! This module provides functionality for:
//! - Grouping inventory records by path, size and path, or size
//! - Filtering out files too small to be worth a hardlink
//! - Summarizing the space hardlinking the candidates would free

pub mod analyzer;
pub mod groups;

pub use analyzer::{AnalyzerConfig, DuplicateAnalyzer, DEFAULT_MIN_WORTHWHILE_SIZE};
pub use groups::{CandidateSummary, DuplicateGroup, GroupKey, GroupingStrategy};
