//! JSON report of duplicate candidate groups.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "strategy": "size-path",
//!   "min_worthwhile_size_bytes": 10240,
//!   "groups": [
//!     {
//!       "key": { "size_bytes": 20480, "relative_path": "etc/big.bin" },
//!       "member_count": 2,
//!       "total_bytes": 40960,
//!       "reclaimable_bytes": 20480,
//!       "members": [
//!         {
//!           "inode": 1201,
//!           "path": "/snap/a/etc/big.bin",
//!           "root": "/snap/a",
//!           "relative_path": "etc/big.bin",
//!           "size_bytes": 20480,
//!           "link_count": 1,
//!           "occurrence_count": 1
//!         }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "group_count": 1,
//!     "member_count": 2,
//!     "total_bytes": 40960,
//!     "reclaimable_bytes": 20480
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{AnalyzerConfig, CandidateSummary, DuplicateGroup, GroupKey, GroupingStrategy};
use crate::inventory::FileRecord;

/// One group member in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMember {
    /// Inode number
    pub inode: u64,
    /// Root and relative path joined
    pub path: String,
    /// Root the inode was first seen under
    pub root: String,
    /// Path relative to `root`
    pub relative_path: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Link count at first sighting
    pub link_count: u64,
    /// Times the inode was seen
    pub occurrence_count: u64,
}

impl From<&FileRecord> for JsonMember {
    fn from(record: &FileRecord) -> Self {
        Self {
            inode: record.inode,
            path: record.full_path(),
            root: record.root.clone(),
            relative_path: record.relative_path.clone(),
            size_bytes: record.size_bytes,
            link_count: record.link_count,
            occurrence_count: record.occurrence_count,
        }
    }
}

/// One duplicate candidate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// Shared key
    pub key: GroupKey,
    /// Number of members
    pub member_count: usize,
    /// Size of all members
    pub total_bytes: u64,
    /// Bytes freed by linking the members
    pub reclaimable_bytes: u64,
    /// Members, ascending inode
    pub members: Vec<JsonMember>,
}

impl From<&DuplicateGroup> for JsonGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            key: group.key.clone(),
            member_count: group.len(),
            total_bytes: group.total_bytes(),
            reclaimable_bytes: group.reclaimable_bytes(),
            members: group.members.iter().map(JsonMember::from).collect(),
        }
    }
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Grouping strategy used
    pub strategy: GroupingStrategy,
    /// Size threshold used
    pub min_worthwhile_size_bytes: u64,
    /// Candidate groups, in query order
    pub groups: Vec<JsonGroup>,
    /// Totals
    pub summary: CandidateSummary,
}

impl JsonOutput {
    /// Build the report for `groups` found with `config`.
    ///
    /// # Example
    ///
    /// ```
    /// use treehardlink::duplicates::AnalyzerConfig;
    /// use treehardlink::output::json::JsonOutput;
    ///
    /// let output = JsonOutput::new(&[], &AnalyzerConfig::default());
    /// let json = output.to_json().unwrap();
    /// assert!(json.contains(r#""strategy":"size-path""#));
    /// ```
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], config: &AnalyzerConfig) -> Self {
        Self {
            strategy: config.strategy,
            min_worthwhile_size_bytes: config.min_worthwhile_size_bytes,
            groups: groups.iter().map(JsonGroup::from).collect(),
            summary: CandidateSummary::from_groups(groups),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
