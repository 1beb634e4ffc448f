use criterion::{criterion_group, criterion_main, Criterion};
use pagedindex::{Blob, Index, Key, KeyType, Storage, StorageConfig};

fn setup() -> (Storage, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::create(dir.path().join("bench.db"), &StorageConfig::default()).unwrap();
    (storage, dir)
}

fn bench_sequential_insert(c: &mut Criterion) {
    for n in [100, 1000, 10000] {
        c.bench_function(&format!("sequential_insert_{n}"), |b| {
            b.iter(|| {
                let (storage, _dir) = setup();
                let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I64, true).unwrap();
                for i in 0..n as i64 {
                    index.put(i, &mut Blob::new(vec![0u8; 64])).unwrap();
                }
            });
        });
    }
}

fn bench_lookup(c: &mut Criterion) {
    let (storage, _dir) = setup();
    let mut index: Index<'_, Blob> = Index::create(&storage, KeyType::I64, true).unwrap();
    for i in 0..10_000i64 {
        index.put(i, &mut Blob::new(vec![0u8; 64])).unwrap();
    }

    c.bench_function("point_get_10000", |b| {
        let mut i = 0i64;
        b.iter(|| {
            i = (i + 7919) % 10_000;
            index.get(i).unwrap()
        });
    });

    c.bench_function("range_100_of_10000", |b| {
        b.iter(|| {
            index
                .range(Some(Key::I64(5_000)), Some(Key::I64(5_099)))
                .unwrap()
        });
    });

    c.bench_function("cursor_scan_10000", |b| {
        b.iter(|| index.iter().unwrap().count());
    });
}

criterion_group!(benches, bench_sequential_insert, bench_lookup);
criterion_main!(benches);
