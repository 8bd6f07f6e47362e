// Inode metadata is only collected on Unix.
#![cfg(unix)]

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};
use treehardlink::duplicates::{AnalyzerConfig, DuplicateAnalyzer, GroupingStrategy};
use treehardlink::inventory::InventoryStore;
use treehardlink::pipeline::{InventoryBuilder, PipelineConfig, PipelineError};
use treehardlink::scanner::{RelativePathMode, WalkerConfig};

fn write_file(root: &Path, relative: &str, len: usize) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    File::create(&path).unwrap().write_all(&vec![b'x'; len]).unwrap();
    path
}

/// Two daily snapshots of the same tree, copied rather than hardlinked.
fn two_snapshots() -> (TempDir, Vec<PathBuf>) {
    let base = tempdir().unwrap();
    let roots = vec![base.path().join("daily.0"), base.path().join("daily.1")];
    for root in &roots {
        write_file(root, "etc/big.conf", 20_000);
        write_file(root, "etc/small.conf", 100);
        write_file(root, "var/cache.db", 40_000);
    }
    (base, roots)
}

/// Set `mode` on `dir`. Returns false, with the mode restored, when the
/// process ignores permission bits (running as root).
fn restrict(dir: &Path, mode: u32) -> bool {
    fs::set_permissions(dir, fs::Permissions::from_mode(mode)).unwrap();
    let first_entry = fs::read_dir(dir)
        .ok()
        .and_then(|mut entries| entries.next())
        .and_then(Result::ok)
        .map(|entry| entry.path());
    let enforced = match first_entry {
        None => true,
        Some(path) => fs::symlink_metadata(path).is_err(),
    };
    if !enforced {
        unrestrict(dir);
    }
    enforced
}

fn unrestrict(dir: &Path) {
    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_copied_snapshots_are_candidates() {
    let (_base, roots) = two_snapshots();
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&roots, &store)
        .unwrap();
    store.finalize_indexes().unwrap();
    let groups = DuplicateAnalyzer::default().find_candidates(&store).unwrap();

    assert_eq!(summary.files_ingested(), 6);
    assert_eq!(summary.distinct_inodes, 6);
    assert!(!summary.spans_devices());
    let keys: Vec<_> = groups
        .iter()
        .map(|g| g.key.relative_path().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["etc/big.conf", "var/cache.db"]);
    for group in &groups {
        let roots: Vec<_> = group.members.iter().map(|m| m.root.clone()).collect();
        assert!(roots[0] != roots[1]);
    }
}

#[test]
fn test_hardlink_across_snapshots_is_one_inode() {
    let base = tempdir().unwrap();
    let old = base.path().join("daily.1");
    let new = base.path().join("daily.0");
    let original = write_file(&old, "bin/tool", 50_000);
    fs::create_dir_all(new.join("bin")).unwrap();
    fs::hard_link(&original, new.join("bin/tool")).unwrap();
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&[old.clone(), new], &store)
        .unwrap();
    store.finalize_indexes().unwrap();

    assert_eq!(summary.files_ingested(), 2);
    assert_eq!(summary.distinct_inodes, 1);
    let record = &store.records().unwrap()[0];
    assert_eq!(record.occurrence_count, 2);
    assert_eq!(record.link_count, 2);
    assert_eq!(record.root, old.to_string_lossy());
    assert!(store.link_anomalies().unwrap().is_empty());
    assert!(store.external_links().unwrap().is_empty());
    assert!(DuplicateAnalyzer::default()
        .find_candidates(&store)
        .unwrap()
        .is_empty());
}

#[test]
fn test_overlapping_roots_show_as_link_anomalies() {
    let base = tempdir().unwrap();
    write_file(base.path(), "sub/file.bin", 20_000);
    let store = InventoryStore::open_in_memory().unwrap();

    InventoryBuilder::new(PipelineConfig::default())
        .build(&[base.path().to_path_buf(), base.path().join("sub")], &store)
        .unwrap();

    let anomalies = store.link_anomalies().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].occurrence_count, 2);
    assert_eq!(anomalies[0].relative_path, "sub/file.bin");
}

#[test]
fn test_missing_root_aborts_before_ingesting() {
    let (base, mut roots) = two_snapshots();
    roots.push(base.path().join("daily.2"));
    let store = InventoryStore::open_in_memory().unwrap();

    let err = InventoryBuilder::new(PipelineConfig::default())
        .build(&roots, &store)
        .unwrap_err();

    assert!(matches!(err, PipelineError::RootNotFound(ref p) if p.ends_with("daily.2")));
    assert_eq!(err.to_string(), format!("Directory not found: {}", roots[2].display()));
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_byte_slice_mode_keeps_leading_separator() {
    let (_base, roots) = two_snapshots();
    let store = InventoryStore::open_in_memory().unwrap();
    let config = PipelineConfig::default().with_relative_path_mode(RelativePathMode::ByteSlice);

    InventoryBuilder::new(config).build(&roots[..1], &store).unwrap();

    let sep = std::path::MAIN_SEPARATOR;
    let mut paths: Vec<_> = store
        .records()
        .unwrap()
        .into_iter()
        .map(|r| r.relative_path)
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            format!("{sep}etc{sep}big.conf"),
            format!("{sep}etc{sep}small.conf"),
            format!("{sep}var{sep}cache.db"),
        ]
    );
}

#[test]
fn test_modes_agree_up_to_the_separator() {
    let (_base, roots) = two_snapshots();
    let stripped = InventoryStore::open_in_memory().unwrap();
    let sliced = InventoryStore::open_in_memory().unwrap();

    InventoryBuilder::new(PipelineConfig::default())
        .build(&roots, &stripped)
        .unwrap();
    InventoryBuilder::new(
        PipelineConfig::default().with_relative_path_mode(RelativePathMode::ByteSlice),
    )
    .build(&roots, &sliced)
    .unwrap();

    let stripped = stripped.records().unwrap();
    let sliced = sliced.records().unwrap();
    assert_eq!(stripped.len(), sliced.len());
    for (a, b) in stripped.iter().zip(&sliced) {
        assert_eq!(a.inode, b.inode);
        assert_eq!(&b.relative_path[1..], a.relative_path.as_str());
    }
}

#[test]
fn test_skip_hidden() {
    let base = tempdir().unwrap();
    write_file(base.path(), "visible.bin", 20_000);
    write_file(base.path(), ".hidden.bin", 20_000);
    write_file(base.path(), ".git/objects/pack.bin", 20_000);
    let store = InventoryStore::open_in_memory().unwrap();
    let config = PipelineConfig::default().with_walker_config(WalkerConfig::new(false, true));

    let summary = InventoryBuilder::new(config)
        .build(&[base.path().to_path_buf()], &store)
        .unwrap();

    assert_eq!(summary.files_ingested(), 1);
    assert_eq!(store.records().unwrap()[0].relative_path, "visible.bin");
}

#[test]
fn test_symlinks_are_not_ingested_by_default() {
    let base = tempdir().unwrap();
    let target = write_file(base.path(), "real.bin", 20_000);
    std::os::unix::fs::symlink(&target, base.path().join("alias.bin")).unwrap();
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&[base.path().to_path_buf()], &store)
        .unwrap();

    assert_eq!(summary.files_ingested(), 1);
    assert_eq!(store.records().unwrap()[0].occurrence_count, 1);
}

#[test]
fn test_thread_counts_give_same_inventory() {
    let base = tempdir().unwrap();
    for i in 0..40 {
        write_file(base.path(), &format!("d{}/f{i}.bin", i % 4), 10_000 + i * 100);
    }
    let roots = vec![base.path().to_path_buf()];

    let sequential = InventoryStore::open_in_memory().unwrap();
    InventoryBuilder::new(PipelineConfig::default().with_stat_threads(1).with_batch_size(7))
        .build(&roots, &sequential)
        .unwrap();
    let parallel = InventoryStore::open_in_memory().unwrap();
    InventoryBuilder::new(PipelineConfig::default().with_stat_threads(8))
        .build(&roots, &parallel)
        .unwrap();

    assert_eq!(sequential.records().unwrap(), parallel.records().unwrap());
    assert_eq!(sequential.len().unwrap(), 40);
}

#[test]
fn test_size_grouping_over_pipeline() {
    let base = tempdir().unwrap();
    write_file(base.path(), "a/one.iso", 64_000);
    write_file(base.path(), "b/two.iso", 64_000);
    write_file(base.path(), "c/three.iso", 12_000);
    let store = InventoryStore::open_in_memory().unwrap();

    InventoryBuilder::new(PipelineConfig::default())
        .build(&[base.path().to_path_buf()], &store)
        .unwrap();
    store.finalize_indexes().unwrap();
    let groups = DuplicateAnalyzer::new(
        AnalyzerConfig::default().with_strategy(GroupingStrategy::Size),
    )
    .find_candidates(&store)
    .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.size_bytes(), Some(64_000));
    assert_eq!(groups[0].len(), 2);
}

#[test]
fn test_untraversable_root_is_skipped_and_reported() {
    let (_base, roots) = two_snapshots();
    if !restrict(&roots[0], 0o000) {
        return;
    }
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&roots, &store);
    unrestrict(&roots[0]);
    let summary = summary.unwrap();

    assert!(summary.roots[0].failed());
    assert_eq!(summary.roots[0].files_ingested, 0);
    assert!(!summary.roots[1].failed());
    assert_eq!(summary.failed_roots(), vec![roots[0].as_path()]);
    let records = store.records().unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.root == roots[1].to_string_lossy()));
}

#[test]
fn test_unreadable_subtree_is_counted_and_skipped() {
    let (_base, roots) = two_snapshots();
    let locked = roots[0].join("var");
    if !restrict(&locked, 0o000) {
        return;
    }
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&roots[..1], &store);
    unrestrict(&locked);
    let summary = summary.unwrap();

    assert!(summary.failed_roots().is_empty());
    assert_eq!(summary.subtree_errors(), 1);
    assert_eq!(summary.files_ingested(), 2);
    assert!(store.records().unwrap().iter().all(|r| r.relative_path.starts_with("etc/")));
}

#[test]
fn test_unstattable_files_are_counted_and_skipped() {
    let (_base, roots) = two_snapshots();
    // Listable but not searchable: names are enumerated, lstat fails.
    let locked = roots[0].join("var");
    if !restrict(&locked, 0o444) {
        return;
    }
    let store = InventoryStore::open_in_memory().unwrap();

    let summary = InventoryBuilder::new(PipelineConfig::default())
        .build(&roots[..1], &store);
    unrestrict(&locked);
    let summary = summary.unwrap();

    assert!(summary.failed_roots().is_empty());
    assert_eq!(summary.stat_errors(), 1);
    assert_eq!(summary.roots[0].files_enumerated, 3);
    assert_eq!(summary.files_ingested(), 2);
}

#[test]
fn test_relative_and_absolute_roots_store_the_same_paths() {
    let base = tempfile::Builder::new()
        .prefix("relative-root")
        .tempdir_in(".")
        .unwrap();
    write_file(base.path(), "etc/big.conf", 20_000);
    let relative = base
        .path()
        .strip_prefix(std::env::current_dir().unwrap())
        .unwrap()
        .to_path_buf();
    let from_relative = InventoryStore::open_in_memory().unwrap();
    let from_absolute = InventoryStore::open_in_memory().unwrap();

    InventoryBuilder::new(PipelineConfig::default())
        .build(&[relative], &from_relative)
        .unwrap();
    InventoryBuilder::new(PipelineConfig::default())
        .build(&[base.path().to_path_buf()], &from_absolute)
        .unwrap();

    assert_eq!(from_relative.records().unwrap(), from_absolute.records().unwrap());
}
