//! CSV report of duplicate candidate groups, one row per member.
//!
//! # Columns
//!
//! - `group_id`: 1-based position of the group in the report
//! - `group_key`: the shared key, as displayed in the text report
//! - `size_bytes`: member size
//! - `inode`: member inode
//! - `root`: root the inode was first seen under
//! - `relative_path`: path relative to `root`
//! - `link_count`: link count at first sighting
//! - `occurrence_count`: times the inode was seen across all roots

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    group_key: &'a str,
    size_bytes: u64,
    inode: u64,
    root: &'a str,
    relative_path: &'a str,
    link_count: u64,
    occurrence_count: u64,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            let group_key = group.key.to_string();
            for member in &group.members {
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    group_key: &group_key,
                    size_bytes: member.size_bytes,
                    inode: member.inode,
                    root: &member.root,
                    relative_path: &member.relative_path,
                    link_count: member.link_count,
                    occurrence_count: member.occurrence_count,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
