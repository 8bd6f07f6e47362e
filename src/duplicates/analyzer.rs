//! Duplicate candidate queries over a finished inventory.
//!
//! Each query is a single SQL statement: a window count over the grouping key
//! tags every qualifying record with the size of its group, singletons are
//! dropped, and rows come back ordered so that the members of one group are
//! contiguous. The rows are then folded into [`DuplicateGroup`]s.
//!
//! Records at or below the minimum-worthwhile size never take part in a group.

use rusqlite::params;

use super::groups::{CandidateSummary, DuplicateGroup, GroupingStrategy};
use crate::inventory::record::RECORD_COLUMNS;
use crate::inventory::{FileRecord, InventoryStore, StoreError};

/// Files at or below this many bytes are not worth a hardlink.
pub const DEFAULT_MIN_WORTHWHILE_SIZE: u64 = 10_240;

/// Configuration for duplicate candidate queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Only records strictly larger than this take part
    pub min_worthwhile_size_bytes: u64,
    /// Which attributes form the grouping key
    pub strategy: GroupingStrategy,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_worthwhile_size_bytes: DEFAULT_MIN_WORTHWHILE_SIZE,
            strategy: GroupingStrategy::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Set the minimum-worthwhile size.
    #[must_use]
    pub fn with_min_worthwhile_size(mut self, bytes: u64) -> Self {
        self.min_worthwhile_size_bytes = bytes;
        self
    }

    /// Set the grouping strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: GroupingStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Read-only duplicate candidate queries.
///
/// # Example
///
/// ```
/// use treehardlink::duplicates::{AnalyzerConfig, DuplicateAnalyzer, GroupingStrategy};
/// use treehardlink::inventory::InventoryStore;
/// use treehardlink::scanner::FileAttributes;
///
/// let store = InventoryStore::open_in_memory().unwrap();
/// store.ingest("/snap/a", &FileAttributes::new(1, "f", 20_000)).unwrap();
/// store.ingest("/snap/b", &FileAttributes::new(2, "f", 20_000)).unwrap();
/// store.ingest("/snap/c", &FileAttributes::new(3, "f", 5_000)).unwrap();
/// store.finalize_indexes().unwrap();
///
/// let analyzer = DuplicateAnalyzer::new(
///     AnalyzerConfig::default().with_strategy(GroupingStrategy::Path),
/// );
/// let groups = analyzer.find_candidates(&store).unwrap();
///
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].inodes(), vec![1, 2]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DuplicateAnalyzer {
    config: AnalyzerConfig,
}

impl DuplicateAnalyzer {
    /// Create an analyzer with the given configuration.
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Group the inventory with the configured strategy.
    ///
    /// Groups have at least two members and are ordered by descending member
    /// count, then ascending key. Members are ordered by ascending inode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn find_candidates(&self, store: &InventoryStore) -> Result<Vec<DuplicateGroup>, StoreError> {
        self.query(store, self.config.strategy)
    }

    /// Groups of records sharing a relative path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn by_relative_path(&self, store: &InventoryStore) -> Result<Vec<DuplicateGroup>, StoreError> {
        self.query(store, GroupingStrategy::Path)
    }

    /// Groups of records sharing both size and relative path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn by_size_and_path(&self, store: &InventoryStore) -> Result<Vec<DuplicateGroup>, StoreError> {
        self.query(store, GroupingStrategy::SizePath)
    }

    /// Groups of records sharing a size.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    pub fn by_size(&self, store: &InventoryStore) -> Result<Vec<DuplicateGroup>, StoreError> {
        self.query(store, GroupingStrategy::Size)
    }

    /// Totals across `groups`.
    #[must_use]
    pub fn summarize(groups: &[DuplicateGroup]) -> CandidateSummary {
        CandidateSummary::from_groups(groups)
    }

    fn query(
        &self,
        store: &InventoryStore,
        strategy: GroupingStrategy,
    ) -> Result<Vec<DuplicateGroup>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM (
                 SELECT {RECORD_COLUMNS},
                        COUNT(*) OVER (PARTITION BY {partition}) AS member_count
                 FROM files
                 WHERE size_bytes > ?1
             )
             WHERE member_count > 1
             ORDER BY member_count DESC, {order}, inode ASC",
            partition = strategy.partition_columns(),
            order = strategy.key_order(),
        );
        // Stored sizes are non-negative i64; anything above i64::MAX excludes all.
        let threshold = i64::try_from(self.config.min_worthwhile_size_bytes).unwrap_or(i64::MAX);

        let records = store.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![threshold], FileRecord::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let groups = fold_groups(strategy, records);
        log::debug!(
            "Grouping by {} above {} bytes: {} candidate groups",
            strategy,
            self.config.min_worthwhile_size_bytes,
            groups.len()
        );
        Ok(groups)
    }
}

/// Fold key-contiguous rows into groups, members by ascending inode.
fn fold_groups(strategy: GroupingStrategy, records: Vec<FileRecord>) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for record in records {
        let key = strategy.key_of(&record);
        match groups.last_mut() {
            Some(group) if group.key == key => group.members.push(record),
            _ => groups.push(DuplicateGroup {
                key,
                members: vec![record],
            }),
        }
    }
    // SQLite orders the bit-cast inodes as signed; re-sort as u64.
    for group in &mut groups {
        group.members.sort_by_key(|m| m.inode);
    }
    groups
}
