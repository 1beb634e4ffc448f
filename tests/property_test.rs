//! Model-based property tests: an index must behave like a `BTreeMap`.

use std::collections::BTreeMap;

use pagedindex::index::{Index, Key, KeyType};
use pagedindex::storage::{Blob, Storage};
use pagedindex::{Error, StorageConfig};
use proptest::prelude::*;
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    Put(u16),
    Set(u16),
    Remove(u16),
}

fn op_strategy(keys: u16) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..keys).prop_map(Op::Put),
        1 => (0..keys).prop_map(Op::Set),
        2 => (0..keys).prop_map(Op::Remove),
    ]
}

/// Variable-length string keys that still sort by `k`.
fn string_key(k: u16) -> String {
    let len = (k as usize * 37) % 900 + 1;
    format!("{k:03}{}", "s".repeat(len))
}

fn run_model<K: Ord + Clone + Into<Key>>(
    key_type: KeyType,
    ops: &[Op],
    to_key: impl Fn(u16) -> K,
) -> Result<(), TestCaseError> {
    let dir = tempdir().unwrap();
    let storage = Storage::create(
        dir.path().join("model.db"),
        &StorageConfig::default().with_pool_size(16),
    )
    .unwrap();
    let mut index: Index<'_, Blob> = Index::create(&storage, key_type, true).unwrap();
    let mut model: BTreeMap<K, String> = BTreeMap::new();

    for (step, op) in ops.iter().enumerate() {
        match *op {
            Op::Put(k) => {
                let value = format!("{k}@{step}");
                let inserted = index.put(to_key(k), &mut Blob::new(value.clone())).unwrap();
                prop_assert_eq!(inserted, !model.contains_key(&to_key(k)));
                model.entry(to_key(k)).or_insert(value);
            }
            Op::Set(k) => {
                let value = format!("{k}@{step}");
                index.set(to_key(k), &mut Blob::new(value.clone())).unwrap();
                model.insert(to_key(k), value);
            }
            Op::Remove(k) => match index.remove_key(to_key(k)) {
                Ok(removed) => {
                    let expected = model.remove(&to_key(k));
                    prop_assert_eq!(removed.as_str(), expected.as_deref());
                }
                Err(Error::KeyNotFound) => prop_assert!(!model.contains_key(&to_key(k))),
                Err(e) => return Err(TestCaseError::fail(format!("remove failed: {e}"))),
            },
        }
        prop_assert_eq!(index.size(), model.len());
        prop_assert!(index.height() > 0 || model.is_empty());
    }

    let expected: Vec<&str> = model.values().map(String::as_str).collect();

    let listed = index.to_vec().unwrap();
    let listed: Vec<&str> = listed.iter().map(|b| b.as_str().unwrap()).collect();
    prop_assert_eq!(&listed, &expected);

    let walked: Vec<Blob> = index.iter().unwrap().map(Result::unwrap).collect();
    let walked: Vec<&str> = walked.iter().map(|b| b.as_str().unwrap()).collect();
    prop_assert_eq!(&walked, &expected);

    for (k, value) in &model {
        let found = index.get(k.clone()).unwrap();
        prop_assert_eq!(found.as_ref().and_then(Blob::as_str), Some(value.as_str()));
    }

    if let (Some(first), Some(last)) = (model.keys().next(), model.keys().next_back()) {
        let all = index
            .range(Some(first.clone().into()), Some(last.clone().into()))
            .unwrap();
        prop_assert_eq!(all.len(), model.len());
    }

    prop_assert_eq!(storage.pinned_page_count(), 0);
    Ok(())
}

#[derive(Debug, Clone)]
enum MultiOp {
    Put(u16),
    /// Remove one of the objects under the key, picked by index.
    Remove(u16, usize),
}

fn multi_op_strategy(keys: u16) -> impl Strategy<Value = MultiOp> {
    prop_oneof![
        3 => (0..keys).prop_map(MultiOp::Put),
        2 => (0..keys, any::<usize>()).prop_map(|(k, i)| MultiOp::Remove(k, i)),
    ]
}

fn key_of(value: &str) -> u16 {
    value.split('@').next().and_then(|k| k.parse().ok()).unwrap()
}

fn run_multi_model<K: Ord + Clone + Into<Key>>(
    key_type: KeyType,
    ops: &[MultiOp],
    to_key: impl Fn(u16) -> K,
) -> Result<(), TestCaseError> {
    let dir = tempdir().unwrap();
    let storage = Storage::create(
        dir.path().join("multi.db"),
        &StorageConfig::default().with_pool_size(16),
    )
    .unwrap();
    let mut index: Index<'_, Blob> = Index::create(&storage, key_type, false).unwrap();
    let mut model: BTreeMap<K, Vec<Blob>> = BTreeMap::new();

    for (step, op) in ops.iter().enumerate() {
        match *op {
            MultiOp::Put(k) => {
                let mut blob = Blob::new(format!("{k}@{step}"));
                prop_assert!(index.put(to_key(k), &mut blob).unwrap());
                model.entry(to_key(k)).or_default().push(blob);
            }
            MultiOp::Remove(k, i) => match model.get_mut(&to_key(k)) {
                Some(blobs) => {
                    let blob = blobs.remove(i % blobs.len());
                    index.remove(to_key(k), &blob).unwrap();
                    if blobs.is_empty() {
                        model.remove(&to_key(k));
                    }
                }
                None => {
                    // An object stored under another key is not an entry for `k`.
                    if let Some(other) = model.values().next().and_then(|blobs| blobs.first()) {
                        prop_assert!(matches!(
                            index.remove(to_key(k), other),
                            Err(Error::KeyNotFound)
                        ));
                    }
                }
            },
        }
        let total: usize = model.values().map(Vec::len).sum();
        prop_assert_eq!(index.size(), total);
    }

    let listed = index.to_vec().unwrap();
    let listed: Vec<&str> = listed.iter().map(|b| b.as_str().unwrap()).collect();
    prop_assert!(listed.windows(2).all(|w| key_of(w[0]) <= key_of(w[1])));

    let mut expected: Vec<&str> = model
        .values()
        .flatten()
        .map(|b| b.as_str().unwrap())
        .collect();
    let mut sorted = listed.clone();
    expected.sort_unstable();
    sorted.sort_unstable();
    prop_assert_eq!(sorted, expected);

    for (k, blobs) in &model {
        let point = index.range(Some(k.clone().into()), Some(k.clone().into())).unwrap();
        prop_assert_eq!(point.len(), blobs.len());
        match index.get(k.clone()) {
            Ok(Some(found)) => prop_assert!(blobs.len() == 1 && found == blobs[0]),
            Err(Error::KeyNotUnique) => prop_assert!(blobs.len() > 1),
            other => return Err(TestCaseError::fail(format!("unexpected get: {other:?}"))),
        }
    }

    prop_assert_eq!(storage.pinned_page_count(), 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn integer_index_matches_model(ops in prop::collection::vec(op_strategy(1200), 0..1500)) {
        run_model(KeyType::I32, &ops, |k| k as i32)?;
    }

    #[test]
    fn string_index_matches_model(ops in prop::collection::vec(op_strategy(300), 0..600)) {
        run_model(KeyType::String, &ops, string_key)?;
    }

    #[test]
    fn non_unique_integer_index_matches_model(ops in prop::collection::vec(multi_op_strategy(40), 0..1500)) {
        run_multi_model(KeyType::I32, &ops, |k| k as i32)?;
    }

    #[test]
    fn non_unique_string_index_matches_model(ops in prop::collection::vec(multi_op_strategy(20), 0..400)) {
        run_multi_model(KeyType::String, &ops, string_key)?;
    }
}
