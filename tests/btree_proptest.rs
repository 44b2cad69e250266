//! Property tests: the B-tree against a `BTreeMap` model.

mod common;

use std::collections::BTreeMap;

use pagedb::index::btree::BTreeIndex;
use pagedb::{Config, Pager, StorageTable};
use proptest::prelude::*;
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Insert(i32),
    Delete(i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..300i32).prop_map(Op::Insert),
        2 => (0..300i32).prop_map(Op::Delete),
    ]
}

fn order_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![Just(4usize), Just(6), Just(8), Just(14)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every operation agrees with the model and leaves a valid tree whose
    /// node count matches the pages the pager has handed out.
    #[test]
    fn prop_index_matches_model(
        order in order_strategy(),
        ops in proptest::collection::vec(op_strategy(), 1..300),
    ) {
        let dir = tempdir().unwrap();
        let config = Config::builder().order(order).max_pages(1000).build();
        let mut pager = Pager::open(dir.path().join("prop.db"), &config).unwrap();
        let mut index: BTreeIndex<i32, u64> = BTreeIndex::new(order);
        let mut model = BTreeMap::new();

        for op in &ops {
            match *op {
                Op::Insert(k) => {
                    let result = index.insert(&mut pager, k, k as u64 * 7);
                    if model.contains_key(&k) {
                        prop_assert!(result.is_err());
                    } else {
                        prop_assert!(result.is_ok());
                        model.insert(k, k as u64 * 7);
                    }
                }
                Op::Delete(k) => {
                    let removed = index.delete(&mut pager, &k).unwrap();
                    prop_assert_eq!(removed, model.remove(&k));
                }
            }

            let shape = index.verify(&mut pager).unwrap();
            prop_assert_eq!(shape.keys, model.len());
            prop_assert_eq!(shape.nodes as i64, pager.stats().net_allocations());
        }

        prop_assert_eq!(index.min_key(&mut pager).unwrap(), model.keys().next().copied());
        prop_assert_eq!(index.max_key(&mut pager).unwrap(), model.keys().next_back().copied());

        let mut walked = Vec::new();
        let mut cursor = index.min_key(&mut pager).unwrap();
        while let Some(k) = cursor {
            walked.push(k);
            cursor = index.next_key(&mut pager, &k).unwrap();
        }
        prop_assert_eq!(walked, model.keys().copied().collect::<Vec<_>>());

        // Draining the tree returns every node page
        for k in model.keys() {
            index.delete(&mut pager, k).unwrap();
        }
        prop_assert!(index.is_empty());
        prop_assert_eq!(pager.free_page_count(), 999);
    }

    /// A reopened table answers every lookup the way it did before closing.
    #[test]
    fn prop_table_survives_reopen(
        ops in proptest::collection::vec(op_strategy(), 1..120),
    ) {
        common::init_tracing();
        let dir = tempdir().unwrap();
        let path = dir.path().join("prop.db");
        let config = Config::builder().order(4).max_pages(500).build();
        let mut model = BTreeMap::new();

        let mut table = StorageTable::open_with(&path, config.clone()).unwrap();
        for op in &ops {
            match *op {
                Op::Insert(k) => {
                    if table.insert(common::record(k)).is_ok() {
                        model.insert(k, common::record(k));
                    }
                }
                Op::Delete(k) => {
                    table.delete(k).unwrap();
                    model.remove(&k);
                }
            }
        }
        table.close().unwrap();

        let mut table = StorageTable::open_with(&path, config).unwrap();
        table.verify().unwrap();
        for k in 0..300 {
            prop_assert_eq!(table.search(k).unwrap(), model.get(&k).cloned());
        }
        let rows: Vec<_> = table.rows().unwrap().map(|r| r.unwrap()).collect();
        prop_assert_eq!(rows, model.into_values().collect::<Vec<_>>());
    }
}
