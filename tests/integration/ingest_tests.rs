use std::sync::Arc;
use std::thread;

use tempfile::tempdir;
use treehardlink::inventory::{InventoryStore, StoreError};
use treehardlink::scanner::FileAttributes;

#[test]
fn test_first_observation_wins() {
    let store = InventoryStore::open_in_memory().unwrap();
    let first = FileAttributes::new(7, "etc/passwd", 30_000).with_link_count(3);
    let mut later = FileAttributes::new(7, "var/other", 1).with_link_count(9);
    later.owner_id = 1000;

    assert_eq!(store.ingest("/snap/a", &first).unwrap(), 1);
    assert_eq!(store.ingest("/snap/b", &later).unwrap(), 2);
    assert_eq!(store.ingest("/snap/c", &later).unwrap(), 3);

    let record = store.record(7).unwrap().unwrap();
    assert_eq!(record.root, "/snap/a");
    assert_eq!(record.relative_path, "etc/passwd");
    assert_eq!(record.size_bytes, 30_000);
    assert_eq!(record.link_count, 3);
    assert_eq!(record.owner_id, 0);
    assert_eq!(record.occurrence_count, 3);
    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.total_occurrences().unwrap(), 3);
}

#[test]
fn test_batch_counts_new_inodes_only() {
    let store = InventoryStore::open_in_memory().unwrap();
    let batch = vec![
        FileAttributes::new(1, "a", 10),
        FileAttributes::new(2, "b", 10),
        FileAttributes::new(1, "c", 10),
    ];

    assert_eq!(store.ingest_batch("/snap/a", &batch).unwrap(), 2);
    assert_eq!(store.ingest_batch("/snap/b", &batch).unwrap(), 0);
    assert_eq!(store.ingest_batch("/snap/b", &[]).unwrap(), 0);

    assert_eq!(store.record(1).unwrap().unwrap().occurrence_count, 4);
    assert_eq!(store.record(2).unwrap().unwrap().occurrence_count, 2);
}

#[test]
fn test_concurrent_ingest_from_many_threads() {
    let store = Arc::new(InventoryStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..6)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..50 {
                    let attrs = FileAttributes::new(i % 5, format!("t{t}/f{i}"), 20_000);
                    store.ingest(&format!("/snap/{t}"), &attrs).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len().unwrap(), 5);
    assert_eq!(store.total_occurrences().unwrap(), 300);
    for record in store.records().unwrap() {
        assert_eq!(record.occurrence_count, 60);
    }
}

#[test]
fn test_link_count_comparisons() {
    let store = InventoryStore::open_in_memory().unwrap();
    // Seen twice, one link: overlapping roots.
    store.ingest("/a", &FileAttributes::new(1, "x", 1)).unwrap();
    store.ingest("/a", &FileAttributes::new(1, "x", 1)).unwrap();
    // Seen once, three links: names outside the scan.
    store
        .ingest("/a", &FileAttributes::new(2, "y", 1).with_link_count(3))
        .unwrap();
    // Seen as often as linked.
    store.ingest("/a", &FileAttributes::new(3, "z", 1)).unwrap();

    let anomalies: Vec<u64> = store.link_anomalies().unwrap().iter().map(|r| r.inode).collect();
    let external: Vec<u64> = store.external_links().unwrap().iter().map(|r| r.inode).collect();

    assert_eq!(anomalies, vec![1]);
    assert_eq!(external, vec![2]);
}

#[test]
fn test_file_store_is_recreated_on_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("inventory.sqlite3");

    let store = InventoryStore::open(&path).unwrap();
    store.ingest("/snap/a", &FileAttributes::new(1, "f", 20_000)).unwrap();
    store.finalize_indexes().unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    store.close().unwrap();

    let reopened = InventoryStore::open(&path).unwrap();
    assert!(reopened.is_empty().unwrap());
    assert!(reopened.index_names().unwrap().is_empty());
    reopened.close().unwrap();
}

#[test]
fn test_finalize_indexes_twice_on_empty_store() {
    let store = InventoryStore::open_in_memory().unwrap();

    store.finalize_indexes().unwrap();
    let first = store.index_names().unwrap();
    store.finalize_indexes().unwrap();

    assert_eq!(first.len(), 5);
    assert_eq!(store.index_names().unwrap(), first);
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_open_in_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("no/such/dir/inventory.sqlite3");

    let err = InventoryStore::open(&path).unwrap_err();

    assert!(matches!(err, StoreError::Open { .. }));
    assert!(err.to_string().contains("inventory.sqlite3"));
}
