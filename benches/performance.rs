//! Performance benchmarks for the blob store backends.

use blob_store::{Backend, Blob, BlobStore, BucketConfig, FileStore, StoreConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;

const SIZES: [usize; 3] = [1024, 64 * 1024, 1024 * 1024];

fn stores(dir: &TempDir) -> Vec<(&'static str, Box<dyn BlobStore>)> {
    vec![
        (
            "file",
            Box::new(FileStore::new(dir.path().join("blobs")).unwrap()),
        ),
        (
            "memory",
            Box::new(Backend::open(&StoreConfig::Bucket(BucketConfig::memory())).unwrap()),
        ),
    ]
}

/// Benchmark put with varying blob sizes
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    let dir = TempDir::new().unwrap();

    for (backend, store) in stores(&dir) {
        for size in SIZES {
            let content = vec![0xABu8; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(backend, size), &content, |b, content| {
                b.iter(|| {
                    store
                        .put(Blob::from_bytes("bench", content.clone(), "image/jpeg"))
                        .unwrap();
                });
            });
        }
    }

    group.finish();
}

/// Benchmark get plus a full read of the content
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    let dir = TempDir::new().unwrap();

    for (backend, store) in stores(&dir) {
        for size in SIZES {
            let name = format!("bench-{size}");
            store
                .put(Blob::from_bytes(name.clone(), vec![0xCDu8; size], "image/png"))
                .unwrap();

            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(backend, size), &name, |b, name| {
                b.iter(|| {
                    let blob = store.get(name).unwrap().unwrap();
                    black_box(blob.read_to_vec().unwrap());
                });
            });
        }
    }

    group.finish();
}

/// Benchmark a lookup that finds nothing
fn bench_get_missing(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let mut group = c.benchmark_group("get_missing");

    for (backend, store) in stores(&dir) {
        group.bench_function(backend, |b| {
            b.iter(|| black_box(store.get("covers-999").unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_get, bench_get_missing);
criterion_main!(benches);
