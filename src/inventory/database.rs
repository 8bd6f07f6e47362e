//! SQLite-backed inventory store.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use super::record::{to_sql_u64, FileRecord, RECORD_COLUMNS};
use crate::scanner::FileAttributes;

/// Errors from the inventory store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store file could not be opened or initialized.
    #[error("Cannot open inventory store at {path}: {source}")]
    Open {
        /// Store location
        path: PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed.
    #[error("Inventory store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A second row was inserted for an inode that already has one.
    #[error("Duplicate key violation for inode {inode}")]
    DuplicateKeyViolation {
        /// Offending inode
        inode: u64,
    },

    /// A thread panicked while holding the connection.
    #[error("Inventory store lock poisoned")]
    Poisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

const PRAGMAS_SQL: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA temp_store = MEMORY;
    PRAGMA cache_size = -64000;
";

// Dropping the table drops its indexes with it.
const RECREATE_SCHEMA_SQL: &str = "
    DROP TABLE IF EXISTS files;
    CREATE TABLE files (
        inode            INTEGER PRIMARY KEY,
        root             TEXT    NOT NULL,
        relative_path    TEXT    NOT NULL,
        device_id        INTEGER NOT NULL,
        mode             INTEGER NOT NULL,
        link_count       INTEGER NOT NULL,
        owner_id         INTEGER NOT NULL,
        group_id         INTEGER NOT NULL,
        size_bytes       INTEGER NOT NULL,
        modified_time    INTEGER NOT NULL,
        changed_time     INTEGER NOT NULL,
        occurrence_count INTEGER NOT NULL DEFAULT 0
    );
";

const CREATE_INDEXES_SQL: &str = "
    CREATE INDEX IF NOT EXISTS idx_files_root ON files(root);
    CREATE INDEX IF NOT EXISTS idx_files_relative_path ON files(relative_path);
    CREATE INDEX IF NOT EXISTS idx_files_size_bytes ON files(size_bytes);
    CREATE INDEX IF NOT EXISTS idx_files_link_count ON files(link_count);
    CREATE INDEX IF NOT EXISTS idx_files_size_path ON files(size_bytes, relative_path);
    ANALYZE;
";

// A fresh row has been seen once, so it goes in with a count of 1; every
// later sighting bumps the count and leaves the attributes alone.
const UPSERT_SQL: &str = "
    INSERT INTO files (inode, root, relative_path, device_id, mode, link_count,
                       owner_id, group_id, size_bytes, modified_time, changed_time,
                       occurrence_count)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1)
    ON CONFLICT(inode) DO UPDATE SET occurrence_count = occurrence_count + 1
    RETURNING occurrence_count
";

/// Inventory of distinct inodes across scanned roots.
///
/// Lifecycle: [`open`](Self::open) → [`ingest`](Self::ingest)* →
/// [`finalize_indexes`](Self::finalize_indexes) → queries → [`close`](Self::close).
///
/// The connection sits behind a mutex, so a store can be shared by reference
/// across worker threads. Every ingest is one atomic upsert, so concurrent
/// sightings of the same inode never lose an increment.
///
/// # Example
///
/// ```
/// use treehardlink::inventory::InventoryStore;
/// use treehardlink::scanner::FileAttributes;
///
/// let store = InventoryStore::open_in_memory().unwrap();
/// let attrs = FileAttributes::new(42, "docs/report.pdf", 20_000);
///
/// assert_eq!(store.ingest("/snap/a", &attrs).unwrap(), 1);
/// assert_eq!(store.ingest("/snap/b", &attrs).unwrap(), 2);
///
/// let record = store.record(42).unwrap().unwrap();
/// assert_eq!(record.root, "/snap/a");
/// assert_eq!(record.occurrence_count, 2);
/// ```
#[derive(Debug)]
pub struct InventoryStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl InventoryStore {
    /// Open the store at `path`, discarding any inventory already in it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let open_err = |source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_err)?;
        Self::initialize(&conn).map_err(open_err)?;
        log::debug!("Inventory store opened at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a fresh store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let open_err = |source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        Self::initialize(&conn).map_err(open_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn initialize(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(PRAGMAS_SQL)?;
        conn.execute_batch(RECREATE_SCHEMA_SQL)?;
        log::trace!("Inventory schema recreated");
        Ok(())
    }

    /// Location of the store file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run a read-only closure against the connection.
    pub(crate) fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    /// Record one sighting of `attrs.inode` under `root`.
    ///
    /// The first sighting stores the attributes; later ones only increment
    /// the occurrence count. Returns the occurrence count after this sighting.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the statement fails.
    pub fn ingest(&self, root: &str, attrs: &FileAttributes) -> StoreResult<u64> {
        let conn = self.lock()?;
        upsert(&conn, root, attrs)
    }

    /// Record many sightings under `root` in one transaction.
    ///
    /// Returns how many of them created a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if a statement or the commit fails; in
    /// that case none of the batch is applied.
    pub fn ingest_batch(&self, root: &str, batch: &[FileAttributes]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut created = 0;
        for attrs in batch {
            if upsert(&tx, root, attrs)? == 1 {
                created += 1;
            }
        }
        tx.commit()?;
        log::trace!(
            "Ingested batch of {} under {} ({} new)",
            batch.len(),
            root,
            created
        );
        Ok(created)
    }

    /// Build the lookup indexes used by the duplicate queries.
    ///
    /// Safe to call more than once and on an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if index creation fails.
    pub fn finalize_indexes(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(CREATE_INDEXES_SQL)?;
        log::debug!("Inventory indexes built");
        Ok(())
    }

    /// Names of the indexes currently defined on the inventory table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the catalog cannot be read.
    pub fn index_names(&self) -> StoreResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'index' AND tbl_name = 'files' AND name LIKE 'idx_%' \
                 ORDER BY name",
            )?;
            let names = stmt.query_map([], |row| row.get(0))?;
            names.collect()
        })
    }

    /// Look up the record for one inode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn record(&self, inode: u64) -> StoreResult<Option<FileRecord>> {
        self.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM files WHERE inode = ?1"),
                params![to_sql_u64(inode)],
                FileRecord::from_row,
            )
            .optional()
        })
    }

    /// All records, ordered by inode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn records(&self) -> StoreResult<Vec<FileRecord>> {
        self.select_records("1")
    }

    /// Records seen more often than their captured link count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn link_anomalies(&self) -> StoreResult<Vec<FileRecord>> {
        self.select_records("occurrence_count > link_count")
    }

    /// Records whose inode also has names outside the scanned trees.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn external_links(&self) -> StoreResult<Vec<FileRecord>> {
        self.select_records("occurrence_count < link_count")
    }

    fn select_records(&self, predicate: &str) -> StoreResult<Vec<FileRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM files WHERE {predicate}"
            ))?;
            let rows = stmt.query_map([], FileRecord::from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .map(|mut records| {
            // Inodes at or above 2^63 sort first as signed integers.
            records.sort_by_key(|r| r.inode);
            records
        })
    }

    /// Number of distinct inodes in the inventory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn len(&self) -> StoreResult<u64> {
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get::<_, i64>(0))
        })
        .map(|n| n.unsigned_abs())
    }

    /// Whether no inode has been ingested yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Sum of all occurrence counts, i.e. the number of sightings ingested.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the query fails.
    pub fn total_occurrences(&self) -> StoreResult<u64> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(occurrence_count), 0) FROM files",
                [],
                |row| row.get::<_, i64>(0),
            )
        })
        .map(|n| n.unsigned_abs())
    }

    /// Close the store, reporting any error SQLite raises while doing so.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlite`] if the connection fails to close.
    pub fn close(self) -> StoreResult<()> {
        let conn = self.conn.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

fn upsert(conn: &Connection, root: &str, attrs: &FileAttributes) -> StoreResult<u64> {
    let mut stmt = conn.prepare_cached(UPSERT_SQL)?;
    let count: i64 = stmt
        .query_row(
            params![
                to_sql_u64(attrs.inode),
                root,
                attrs.relative_path,
                to_sql_u64(attrs.device_id),
                attrs.mode,
                to_sql_u64(attrs.link_count),
                attrs.owner_id,
                attrs.group_id,
                to_sql_u64(attrs.size_bytes),
                attrs.modified_time,
                attrs.changed_time,
            ],
            |row| row.get(0),
        )
        .map_err(|e| map_upsert_error(attrs.inode, e))?;
    Ok(count.unsigned_abs())
}

fn map_upsert_error(inode: u64, error: rusqlite::Error) -> StoreError {
    match error.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => StoreError::DuplicateKeyViolation { inode },
        _ => StoreError::Sqlite(error),
    }
}
