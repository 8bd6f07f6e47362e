//! Inventory of distinct inodes across the scanned roots.
//!
//! Every file the collector produces is ingested here. The first sighting of
//! an inode stores its attributes; every sighting, the first included, adds
//! one to its occurrence count. Two names that share an inode are already
//! hardlinked and collapse into one [`FileRecord`].
//!
//! The store is rebuilt from scratch on every run; see [`InventoryStore`].

pub mod database;
pub mod record;

pub use database::{InventoryStore, StoreError, StoreResult};
pub use record::FileRecord;
