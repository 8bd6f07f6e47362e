//! Duplicate candidate groups and grouping strategies.
//!
//! # Overview
//!
//! A [`DuplicateGroup`] is a set of distinct inodes that share a grouping key
//! and are therefore likely to hold the same content. Which attributes form
//! the key is selected by [`GroupingStrategy`]:
//!
//! | Strategy    | Key                          | Typical use                          |
//! |-------------|------------------------------|--------------------------------------|
//! | `path`      | `relative_path`              | same logical file across snapshots   |
//! | `size-path` | `(size_bytes, relative_path)`| the above, fewer false positives     |
//! | `size`      | `size_bytes`                 | loosest prefilter, renamed files too |
//!
//! Groups carry no content proof. Verify members before linking them.
//!
//! # Example
//!
//! ```
//! use treehardlink::duplicates::{CandidateSummary, DuplicateGroup, GroupKey};
//!
//! let group = DuplicateGroup::new(GroupKey::Size { size_bytes: 4096 }, Vec::new());
//! assert!(group.is_empty());
//!
//! let summary = CandidateSummary::from_groups(&[group]);
//! assert_eq!(summary.group_count, 1);
//! assert_eq!(summary.reclaimable_bytes, 0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::inventory::FileRecord;

/// Attributes that must match for two records to share a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingStrategy {
    /// Identical relative path; sizes may differ.
    Path,
    /// Identical size and relative path.
    #[default]
    SizePath,
    /// Identical size only.
    Size,
}

impl GroupingStrategy {
    /// Columns the window count partitions on.
    pub(crate) fn partition_columns(self) -> &'static str {
        match self {
            GroupingStrategy::Path => "relative_path",
            GroupingStrategy::SizePath => "size_bytes, relative_path",
            GroupingStrategy::Size => "size_bytes",
        }
    }

    /// Tiebreak for groups of equal member count: ascending key, path first.
    pub(crate) fn key_order(self) -> &'static str {
        match self {
            GroupingStrategy::Path => "relative_path ASC",
            GroupingStrategy::SizePath => "relative_path ASC, size_bytes ASC",
            GroupingStrategy::Size => "size_bytes ASC",
        }
    }

    /// Grouping key of `record` under this strategy.
    #[must_use]
    pub fn key_of(self, record: &FileRecord) -> GroupKey {
        match self {
            GroupingStrategy::Path => GroupKey::Path {
                relative_path: record.relative_path.clone(),
            },
            GroupingStrategy::SizePath => GroupKey::SizePath {
                size_bytes: record.size_bytes,
                relative_path: record.relative_path.clone(),
            },
            GroupingStrategy::Size => GroupKey::Size {
                size_bytes: record.size_bytes,
            },
        }
    }
}

impl fmt::Display for GroupingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingStrategy::Path => write!(f, "path"),
            GroupingStrategy::SizePath => write!(f, "size-path"),
            GroupingStrategy::Size => write!(f, "size"),
        }
    }
}

/// The shared attributes of a group's members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    /// Key of a [`GroupingStrategy::Path`] group
    Path {
        /// Shared relative path
        relative_path: String,
    },
    /// Key of a [`GroupingStrategy::SizePath`] group
    SizePath {
        /// Shared size in bytes
        size_bytes: u64,
        /// Shared relative path
        relative_path: String,
    },
    /// Key of a [`GroupingStrategy::Size`] group
    Size {
        /// Shared size in bytes
        size_bytes: u64,
    },
}

impl GroupKey {
    /// Shared size, if the key includes one.
    #[must_use]
    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            GroupKey::Path { .. } => None,
            GroupKey::SizePath { size_bytes, .. } | GroupKey::Size { size_bytes } => {
                Some(*size_bytes)
            }
        }
    }

    /// Shared relative path, if the key includes one.
    #[must_use]
    pub fn relative_path(&self) -> Option<&str> {
        match self {
            GroupKey::Path { relative_path } | GroupKey::SizePath { relative_path, .. } => {
                Some(relative_path)
            }
            GroupKey::Size { .. } => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Path { relative_path } => write!(f, "{relative_path}"),
            GroupKey::SizePath {
                size_bytes,
                relative_path,
            } => write!(f, "{relative_path} ({size_bytes} bytes)"),
            GroupKey::Size { size_bytes } => write!(f, "{size_bytes} bytes"),
        }
    }
}

/// Distinct inodes sharing one grouping key.
///
/// Members are ordered by ascending inode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Shared key
    pub key: GroupKey,
    /// Member records
    pub members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a group, sorting `members` by inode.
    #[must_use]
    pub fn new(key: GroupKey, mut members: Vec<FileRecord>) -> Self {
        members.sort_by_key(|m| m.inode);
        Self { key, members }
    }

    /// Number of member inodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total size of all members in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.members.iter().map(|m| m.size_bytes).sum()
    }

    /// Size of the largest member.
    #[must_use]
    pub fn largest_member_bytes(&self) -> u64 {
        self.members.iter().map(|m| m.size_bytes).max().unwrap_or(0)
    }

    /// Bytes freed if every member but the largest became a link to one copy.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.total_bytes()
            .saturating_sub(self.largest_member_bytes())
    }

    /// Inodes of the members, ascending.
    #[must_use]
    pub fn inodes(&self) -> Vec<u64> {
        self.members.iter().map(|m| m.inode).collect()
    }
}

/// Totals across a set of duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CandidateSummary {
    /// Number of groups
    pub group_count: usize,
    /// Number of member files across all groups
    pub member_count: usize,
    /// Size of all members in bytes
    pub total_bytes: u64,
    /// Bytes that hardlinking the candidates would free
    pub reclaimable_bytes: u64,
}

impl CandidateSummary {
    /// Sum up `groups`.
    #[must_use]
    pub fn from_groups(groups: &[DuplicateGroup]) -> Self {
        groups.iter().fold(Self::default(), |acc, group| Self {
            group_count: acc.group_count + 1,
            member_count: acc.member_count + group.len(),
            total_bytes: acc.total_bytes + group.total_bytes(),
            reclaimable_bytes: acc.reclaimable_bytes + group.reclaimable_bytes(),
        })
    }

    /// Reclaimable space in human-readable form.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_bytes).to_string()
    }
}
