//! End-to-end tests of index operations.

use pagedindex::index::{Index, Key, KeyType};
use pagedindex::storage::{Blob, MarkSet, Persistent, Storage};
use pagedindex::{Error, StorageConfig};
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn create_storage() -> (Storage, tempfile::TempDir) {
    init_tracing();
    let dir = tempdir().unwrap();
    let storage = Storage::create(
        dir.path().join("index.db"),
        &StorageConfig::default().with_pool_size(32),
    )
    .unwrap();
    (storage, dir)
}

fn text(blob: &Blob) -> &str {
    blob.as_str().unwrap()
}

fn texts(blobs: &[Blob]) -> Vec<&str> {
    blobs.iter().map(text).collect()
}

fn long_key(i: usize) -> String {
    format!("{i:05}{}", "x".repeat(995))
}

#[test]
fn test_small_unique_index() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I32, true).unwrap();

    for v in [5, 3, 8, 1] {
        assert!(index.put(v, &mut Blob::new(v.to_string())).unwrap());
    }
    assert_eq!(index.size(), 4);

    let all: Vec<Blob> = index.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(texts(&all), ["1", "3", "5", "8"]);

    let middle = index.range(Some(Key::I32(3)), Some(Key::I32(8))).unwrap();
    assert_eq!(texts(&middle), ["3", "5", "8"]);

    assert_eq!(text(&index.remove_key(5).unwrap()), "5");
    assert_eq!(index.size(), 3);
    let all: Vec<Blob> = index.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(texts(&all), ["1", "3", "8"]);

    assert!(!index.put(3, &mut Blob::new("again")).unwrap());
    assert_eq!(index.size(), 3);
    assert_eq!(text(&index.get(3).unwrap().unwrap()), "3");
    assert_eq!(storage.pinned_page_count(), 0);
}

#[test]
fn test_set_overwrites() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true).unwrap();

    index.put("k", &mut Blob::new("old")).unwrap();
    index.set("k", &mut Blob::new("new")).unwrap();

    assert_eq!(index.size(), 1);
    assert_eq!(text(&index.get("k").unwrap().unwrap()), "new");
}

#[test]
fn test_non_unique_index() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I32, false).unwrap();

    let mut a = Blob::new("a");
    let mut b = Blob::new("b");
    assert!(index.put(1, &mut a).unwrap());
    assert!(index.put(1, &mut b).unwrap());
    index.put(2, &mut Blob::new("c")).unwrap();

    assert_eq!(index.size(), 3);
    assert!(matches!(index.get(1), Err(Error::KeyNotUnique)));
    assert_eq!(index.range(Some(Key::I32(1)), Some(Key::I32(1))).unwrap().len(), 2);
    assert!(matches!(index.remove_key(1), Err(Error::KeyNotUnique)));

    index.remove(1, &a).unwrap();
    assert_eq!(index.size(), 2);
    assert_eq!(text(&index.get(1).unwrap().unwrap()), "b");
    assert!(matches!(index.remove(1, &a), Err(Error::KeyNotFound)));
}

#[test]
fn test_open_ranges() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::F64, true).unwrap();
    for v in [-2.5, 0.0, 1.5, 3.25] {
        index.put(v, &mut Blob::new(v.to_string())).unwrap();
    }

    assert_eq!(texts(&index.range(None, Some(Key::F64(0.0))).unwrap()), ["-2.5", "0"]);
    assert_eq!(texts(&index.range(Some(Key::F64(1.0)), None).unwrap()), ["1.5", "3.25"]);
    assert_eq!(index.range(None, None).unwrap().len(), 4);
    assert!(index.range(Some(Key::F64(5.0)), None).unwrap().is_empty());
}

#[test]
fn test_date_keys() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> =
        Index::create_for::<std::time::SystemTime>(&storage, true).unwrap();
    assert_eq!(index.key_type(), KeyType::Date);

    let day = Duration::from_secs(86_400);
    index.put(UNIX_EPOCH + day, &mut Blob::new("day one")).unwrap();
    index.put(UNIX_EPOCH, &mut Blob::new("epoch")).unwrap();

    let all = index.to_vec().unwrap();
    assert_eq!(texts(&all), ["epoch", "day one"]);
    assert_eq!(text(&index.get(Key::Date(86_400_000)).unwrap().unwrap()), "day one");
}

#[test]
fn test_unsupported_key_class() {
    let (storage, _dir) = create_storage();
    let result = Index::<Blob>::create_for::<Vec<u8>>(&storage, true);
    assert!(matches!(result, Err(Error::UnsupportedIndexType(_))));
}

#[test]
fn test_oversized_string_key() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true).unwrap();
    let mut blob = Blob::new("x");

    assert!(matches!(
        index.put("k".repeat(2000), &mut blob),
        Err(Error::KeyTooLarge { size: 2000, .. })
    ));
    assert!(blob.oid().is_none());
    assert_eq!(index.size(), 0);
}

#[test]
fn test_clear_resets_index() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I32, true).unwrap();
    let live_before = storage.live_page_count();

    for v in 0..1000 {
        index.put(v, &mut Blob::new("v")).unwrap();
    }
    assert!(index.height() > 1);

    index.clear().unwrap();
    assert_eq!(index.size(), 0);
    assert_eq!(index.height(), 0);
    assert!(index.get(10).unwrap().is_none());
    assert!(!index.iter().unwrap().has_next());
    // Tree pages are gone; the 1000 objects stay.
    assert_eq!(storage.live_page_count(), live_before + 1000);

    assert!(index.put(10, &mut Blob::new("fresh")).unwrap());
    assert_eq!(index.height(), 1);
    assert_eq!(index.size(), 1);
}

#[test]
fn test_height_grows_and_shrinks_with_string_keys() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true).unwrap();

    for i in 0..200 {
        index.put(long_key(i), &mut Blob::new(i.to_string())).unwrap();
    }
    assert_eq!(index.size(), 200);
    assert!(index.height() >= 3, "height {}", index.height());

    let all = index.to_vec().unwrap();
    let expected: Vec<String> = (0..200).map(|i| i.to_string()).collect();
    assert_eq!(texts(&all), expected);

    for i in (0..200).filter(|i| i % 50 != 0) {
        index.remove_key(long_key(i)).unwrap();
    }
    assert_eq!(index.size(), 4);
    assert_eq!(index.height(), 1);
    assert_eq!(texts(&index.to_vec().unwrap()), ["0", "50", "100", "150"]);
    assert_eq!(storage.pinned_page_count(), 0);
}

/// Linear congruential generator for repeatable key lengths and orders.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn test_removal_can_grow_height_with_variable_keys() {
    const KEYS: usize = 1500;
    let mut growths = 0;

    for seed in [7u64, 42, 1234, 99991] {
        let (storage, _dir) = create_storage();
        let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true).unwrap();
        let mut rng = Lcg(seed);

        let mut keys: Vec<String> = (0..KEYS)
            .map(|i| {
                let len = 5 + (rng.next() % 1020) as usize;
                format!("{i:04}{}", "v".repeat(len - 4))
            })
            .collect();
        for i in 0..KEYS {
            let j = (i * 997) % KEYS;
            index.put(keys[j].as_str(), &mut Blob::new(j.to_string())).unwrap();
        }
        assert_eq!(index.size(), KEYS);

        // Fisher-Yates shuffle of the removal order.
        for i in (1..keys.len()).rev() {
            let j = (rng.next() % (i as u64 + 1)) as usize;
            keys.swap(i, j);
        }
        for key in &keys {
            let before = index.height();
            let removed = index.remove_key(key.as_str()).unwrap();
            assert_eq!(text(&removed), key[..4].parse::<usize>().unwrap().to_string());
            if index.height() > before {
                growths += 1;
            }
        }
        assert_eq!(index.size(), 0);
        assert!(index.to_vec().unwrap().is_empty());
        assert_eq!(storage.pinned_page_count(), 0);
    }

    // A re-keyed separator can be longer than the one it replaces.
    assert!(growths > 0, "no removal split the root");
}

#[test]
fn test_height_shrinks_with_scalar_keys() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I64, true).unwrap();

    for v in 0..3000i64 {
        index.put(v, &mut Blob::new(v.to_string())).unwrap();
    }
    assert!(index.height() >= 2);

    for v in (0..3000i64).rev().filter(|v| v % 100 != 0) {
        index.remove_key(v).unwrap();
    }
    assert_eq!(index.size(), 30);
    assert_eq!(index.height(), 1);
    assert_eq!(text(&index.get(2900i64).unwrap().unwrap()), "2900");
}

#[test]
fn test_mark_tree() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I32, true).unwrap();

    let mut marks = MarkSet::new();
    index.mark_tree(&mut marks).unwrap();
    assert_eq!(marks.page_count(), 0);

    let mut blobs: Vec<Blob> = (0..400).map(|v| Blob::new(v.to_string())).collect();
    for (v, blob) in blobs.iter_mut().enumerate() {
        index.put(v as i32, blob).unwrap();
    }

    index.mark_tree(&mut marks).unwrap();
    assert_eq!(marks.object_count(), 400);
    assert!(blobs.iter().all(|b| marks.is_object_marked(b.oid().unwrap())));
    assert!(marks.page_count() >= 3);
}

#[test]
fn test_prefix_search_across_pages() {
    let (storage, _dir) = create_storage();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::String, true).unwrap();

    for i in 0..200 {
        index.put(long_key(i), &mut Blob::new(i.to_string())).unwrap();
    }
    assert!(index.height() >= 3);

    // "0010" through "0019" span several leaves.
    let tens = index.prefix_search("0001").unwrap();
    let expected: Vec<String> = (10..20).map(|i| i.to_string()).collect();
    assert_eq!(texts(&tens), expected);

    assert_eq!(index.prefix_search("0").unwrap().len(), 200);
    assert_eq!(texts(&index.prefix_search(&long_key(0)).unwrap()), ["0"]);
    assert_eq!(texts(&index.prefix_search(&long_key(199)).unwrap()), ["199"]);
    assert!(index.prefix_search("1").unwrap().is_empty());
    assert!(index.prefix_search("a").unwrap().is_empty());
    assert_eq!(storage.pinned_page_count(), 0);
}
