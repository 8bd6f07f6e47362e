//! Stored inventory record definitions.

use rusqlite::Row;
use serde::Serialize;

use crate::scanner::path_utils::rejoin;

/// Column list matching [`FileRecord::from_row`].
pub(crate) const RECORD_COLUMNS: &str = "inode, root, relative_path, device_id, mode, link_count, \
     owner_id, group_id, size_bytes, modified_time, changed_time, occurrence_count";

/// One distinct inode observed across the scanned roots.
///
/// Attributes are those of the first observation; only `occurrence_count`
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Inode number, the primary key
    pub inode: u64,
    /// Root the inode was first observed under
    pub root: String,
    /// Path relative to `root` at first observation
    pub relative_path: String,
    /// Device of the first observation
    pub device_id: u64,
    /// Raw `st_mode` bits
    pub mode: u32,
    /// Link count reported by the filesystem at first observation
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
    /// Number of times the inode was seen while walking the roots
    pub occurrence_count: u64,
}

impl FileRecord {
    /// Build a record from a row selected with [`RECORD_COLUMNS`].
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            inode: from_sql_u64(row.get(0)?),
            root: row.get(1)?,
            relative_path: row.get(2)?,
            device_id: from_sql_u64(row.get(3)?),
            mode: row.get(4)?,
            link_count: from_sql_u64(row.get(5)?),
            owner_id: row.get(6)?,
            group_id: row.get(7)?,
            size_bytes: from_sql_u64(row.get(8)?),
            modified_time: row.get(9)?,
            changed_time: row.get(10)?,
            occurrence_count: from_sql_u64(row.get(11)?),
        })
    }

    /// Full path of the first observation.
    #[must_use]
    pub fn full_path(&self) -> String {
        rejoin(&self.root, &self.relative_path)
    }

    /// The inode has names outside the scanned trees.
    #[must_use]
    pub fn has_external_links(&self) -> bool {
        self.occurrence_count < self.link_count
    }

    /// Seen more often than it has links: the captured link count was stale.
    #[must_use]
    pub fn is_link_anomaly(&self) -> bool {
        self.occurrence_count > self.link_count
    }
}

// SQLite integers are signed; u64 values are stored as the same 64 bits.

#[allow(clippy::cast_possible_wrap)]
pub(crate) fn to_sql_u64(value: u64) -> i64 {
    value as i64
}

#[allow(clippy::cast_sign_loss)]
pub(crate) fn from_sql_u64(value: i64) -> u64 {
    value as u64
}
