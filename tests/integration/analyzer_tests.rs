use treehardlink::duplicates::{
    AnalyzerConfig, DuplicateAnalyzer, GroupKey, GroupingStrategy, DEFAULT_MIN_WORTHWHILE_SIZE,
};
use treehardlink::inventory::InventoryStore;
use treehardlink::scanner::FileAttributes;

fn store_with(records: &[(u64, &str, u64)]) -> InventoryStore {
    let store = InventoryStore::open_in_memory().unwrap();
    for &(inode, path, size) in records {
        store
            .ingest("/snap", &FileAttributes::new(inode, path, size))
            .unwrap();
    }
    store.finalize_indexes().unwrap();
    store
}

fn analyzer(strategy: GroupingStrategy) -> DuplicateAnalyzer {
    DuplicateAnalyzer::new(AnalyzerConfig::default().with_strategy(strategy))
}

#[test]
fn test_path_grouping_skips_small_member() {
    let store = store_with(&[(1, "/a/f", 20_000), (2, "/a/f", 20_000), (3, "/a/f", 5_000)]);

    let groups = analyzer(GroupingStrategy::Path).find_candidates(&store).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(
        groups[0].key,
        GroupKey::Path {
            relative_path: "/a/f".to_string()
        }
    );
    assert_eq!(groups[0].inodes(), vec![1, 2]);
}

#[test]
fn test_same_size_different_paths() {
    let store = store_with(&[(1, "/x", 50_000), (2, "/y", 50_000)]);

    assert!(analyzer(GroupingStrategy::Path)
        .find_candidates(&store)
        .unwrap()
        .is_empty());
    assert!(analyzer(GroupingStrategy::SizePath)
        .find_candidates(&store)
        .unwrap()
        .is_empty());

    let by_size = analyzer(GroupingStrategy::Size).find_candidates(&store).unwrap();
    assert_eq!(by_size.len(), 1);
    assert_eq!(by_size[0].key, GroupKey::Size { size_bytes: 50_000 });
    assert_eq!(by_size[0].inodes(), vec![1, 2]);
}

#[test]
fn test_path_group_may_mix_sizes() {
    let store = store_with(&[(1, "log", 20_000), (2, "log", 30_000)]);

    let by_path = analyzer(GroupingStrategy::Path).find_candidates(&store).unwrap();
    let by_size_path = analyzer(GroupingStrategy::SizePath)
        .find_candidates(&store)
        .unwrap();

    assert_eq!(by_path.len(), 1);
    assert_eq!(by_path[0].total_bytes(), 50_000);
    assert_eq!(by_path[0].reclaimable_bytes(), 20_000);
    assert!(by_size_path.is_empty());
}

#[test]
fn test_threshold_is_exclusive() {
    let at = DEFAULT_MIN_WORTHWHILE_SIZE;
    let store = store_with(&[(1, "f", at), (2, "f", at), (3, "g", at + 1), (4, "g", at + 1)]);

    let groups = analyzer(GroupingStrategy::Size).find_candidates(&store).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.size_bytes(), Some(at + 1));
}

#[test]
fn test_ordering_by_count_then_key() {
    let store = store_with(&[
        (10, "b", 20_000),
        (11, "b", 20_000),
        (1, "a", 20_000),
        (2, "a", 20_000),
        (30, "c", 20_000),
        (5, "c", 20_000),
        (4, "c", 20_000),
    ]);

    let groups = analyzer(GroupingStrategy::SizePath)
        .find_candidates(&store)
        .unwrap();
    let keys: Vec<_> = groups
        .iter()
        .map(|g| g.key.relative_path().unwrap().to_string())
        .collect();

    assert_eq!(keys, vec!["c", "a", "b"]);
    assert_eq!(groups[0].inodes(), vec![4, 5, 30]);
}

#[test]
fn test_size_tiebreak_ascending() {
    let store = store_with(&[
        (1, "p", 40_000),
        (2, "q", 40_000),
        (3, "r", 20_000),
        (4, "s", 20_000),
    ]);

    let groups = analyzer(GroupingStrategy::Size).find_candidates(&store).unwrap();
    let sizes: Vec<_> = groups.iter().filter_map(|g| g.key.size_bytes()).collect();

    assert_eq!(sizes, vec![20_000, 40_000]);
}

#[test]
fn test_queries_are_repeatable() {
    let store = store_with(&[
        (1, "a", 20_000),
        (2, "a", 20_000),
        (3, "b", 20_000),
        (4, "b", 20_000),
        (5, "b", 20_000),
    ]);
    let analyzer = analyzer(GroupingStrategy::Path);

    let first = analyzer.by_relative_path(&store).unwrap();
    let second = analyzer.by_relative_path(&store).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.len().unwrap(), 5);
}

#[test]
fn test_empty_store_has_no_candidates() {
    let store = store_with(&[]);
    let analyzer = DuplicateAnalyzer::default();

    assert!(analyzer.by_relative_path(&store).unwrap().is_empty());
    assert!(analyzer.by_size_and_path(&store).unwrap().is_empty());
    assert!(analyzer.by_size(&store).unwrap().is_empty());
}

#[test]
fn test_queries_work_without_indexes() {
    let store = InventoryStore::open_in_memory().unwrap();
    store.ingest("/a", &FileAttributes::new(1, "f", 20_000)).unwrap();
    store.ingest("/b", &FileAttributes::new(2, "f", 20_000)).unwrap();

    let groups = DuplicateAnalyzer::default().find_candidates(&store).unwrap();

    assert_eq!(groups.len(), 1);
}

#[test]
fn test_summary_over_groups() {
    let store = store_with(&[
        (1, "a", 20_000),
        (2, "a", 20_000),
        (3, "b", 30_000),
        (4, "b", 30_000),
        (5, "b", 30_000),
    ]);

    let groups = analyzer(GroupingStrategy::SizePath)
        .find_candidates(&store)
        .unwrap();
    let summary = DuplicateAnalyzer::summarize(&groups);

    assert_eq!(summary.group_count, 2);
    assert_eq!(summary.member_count, 5);
    assert_eq!(summary.total_bytes, 130_000);
    assert_eq!(summary.reclaimable_bytes, 80_000);
}
