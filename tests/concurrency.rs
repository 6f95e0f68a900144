//! Concurrent writers and readers on the same name.

use blob_store::{Backend, Blob, BlobStore, BucketConfig, FileStore, StoreConfig};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const ROUNDS: usize = 50;

fn payload(tag: u8, len: usize) -> Vec<u8> {
    vec![tag; len]
}

/// The stored pair must come wholly from one writer.
fn assert_whole(bytes: &[u8], content_type: &str) {
    let expected = match content_type {
        "application/x-a" => b'A',
        "application/x-b" => b'B',
        other => panic!("unexpected content-type {other}"),
    };
    assert!(!bytes.is_empty(), "empty read");
    assert!(
        bytes.iter().all(|&b| b == expected),
        "bytes do not match {content_type}"
    );
}

fn race_writers(store: Arc<dyn BlobStore>) {
    for round in 0..ROUNDS {
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [(b'A', "application/x-a"), (b'B', "application/x-b")]
            .into_iter()
            .map(|(tag, content_type)| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .put(Blob::from_bytes("x", payload(tag, 64 * 1024 + round), content_type))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let blob = store.get("x").unwrap().unwrap();
        let content_type = blob.content_type().to_string();
        let bytes = blob.read_to_vec().unwrap();
        assert_whole(&bytes, &content_type);
        assert_eq!(bytes.len(), 64 * 1024 + round);
    }
}

#[test]
fn test_concurrent_puts_file_store() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(FileStore::new(dir.path()).unwrap());
    race_writers(store);
}

#[test]
fn test_concurrent_puts_bucket_store() {
    let store: Arc<dyn BlobStore> =
        Arc::new(Backend::open(&StoreConfig::Bucket(BucketConfig::memory())).unwrap());
    race_writers(store);
}

#[test]
fn test_readers_never_see_torn_writes() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(dir.path()).unwrap());
    store
        .put(Blob::from_bytes("x", payload(b'A', 128 * 1024), "application/x-a"))
        .unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for i in 0..ROUNDS {
                let (tag, content_type) = if i % 2 == 0 {
                    (b'B', "application/x-b")
                } else {
                    (b'A', "application/x-a")
                };
                store
                    .put(Blob::from_bytes("x", payload(tag, 128 * 1024), content_type))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let blob = store.get("x").unwrap().expect("blob stays present");
                    let content_type = blob.content_type().to_string();
                    let bytes = blob.read_to_vec().unwrap();
                    assert_eq!(bytes.len(), 128 * 1024);
                    assert_whole(&bytes, &content_type);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
