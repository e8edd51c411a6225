/*!
 * Concurrency Tests
 * Many threads against shared layers
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use layerfs::vfs::{
    CacheConfig, CachingFs, ExtendedAttribute, ExtendedSupportFs, FileSystem, MemFs,
    UnixPermissions, VfsError,
};
use pretty_assertions::assert_eq;

use super::common::{put, read_all};

const THREADS: usize = 8;

#[test]
fn test_concurrent_file_creation() {
    let fs = Arc::new(MemFs::new());
    fs.create_directory("/work").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..25 {
                    let path = format!("/work/{}-{}", t, i);
                    put(&*fs, &path, path.as_bytes());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs.number_of_files_in_directory("/work"), THREADS * 25);
    assert_eq!(read_all(&*fs, "/work/3-7"), b"/work/3-7");
}

#[test]
fn test_readers_see_whole_versions() {
    let fs = Arc::new(MemFs::with_config(layerfs::vfs::MemFsConfig::small_chunks(16)));
    put(&*fs, "/f", &[b'a'; 256]);

    let writer = {
        let fs = Arc::clone(&fs);
        thread::spawn(move || {
            for round in 0..50u8 {
                let fill = if round % 2 == 0 { b'b' } else { b'a' };
                let handle = fs.open_file("/f", false, true).unwrap();
                for offset in (0..256).step_by(16) {
                    fs.write(&handle, &[fill; 16], offset).unwrap();
                }
                fs.close(&handle).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for _ in 0..100 {
                    let content = read_all(&*fs, "/f");
                    assert_eq!(content.len(), 256);
                    let first = content[0];
                    assert!(content.iter().all(|&b| b == first), "torn read");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_caching_layer_across_handles() {
    let fs = Arc::new(CachingFs::with_config(MemFs::new(), CacheConfig::uniform(512)));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let path = format!("/file-{}", t);
                fs.create_file(&path).unwrap();
                barrier.wait();

                let handle = fs.open_file(&path, true, true).unwrap();
                for i in 0..64u64 {
                    fs.write(&handle, &[t as u8; 32], i * 32).unwrap();
                }
                let mut buf = [0u8; 32];
                assert_eq!(fs.read(&handle, &mut buf, 100).unwrap(), 32);
                assert_eq!(buf, [t as u8; 32]);
                fs.close(&handle).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..THREADS {
        assert_eq!(read_all(&*fs, &format!("/file-{}", t)), vec![t as u8; 2048]);
    }
    assert_eq!(fs.cached_handles(), 0);
}

#[test]
fn test_lock_contention_has_one_winner() {
    let fs = Arc::new(ExtendedSupportFs::new(MemFs::new()));
    put(&*fs, "/shared", &[0u8; 64]);
    let barrier = Arc::new(Barrier::new(THREADS));

    let threads: Vec<_> = (0..THREADS)
        .map(|_| {
            let fs = Arc::clone(&fs);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let handle = fs.open_file("/shared", true, true).unwrap();
                barrier.wait();
                let result = fs.lock_file(&handle, 0, 64);
                barrier.wait();
                fs.close(&handle).unwrap();
                result
            })
        })
        .collect();
    let results: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == VfsError::AlreadyLocked));
    assert_eq!(fs.held_locks("/shared"), 0);
}

#[test]
fn test_concurrent_attribute_updates() {
    let fs = Arc::new(ExtendedSupportFs::new(MemFs::new()));
    fs.create_file("/f").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let fs = Arc::clone(&fs);
            thread::spawn(move || {
                for i in 0..10 {
                    let name = format!("attr-{}-{}", t, i);
                    fs.set_extended_attribute("/f", ExtendedAttribute::new(name, vec![t as u8]))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let attributes = fs.list_extended_attributes("/f").unwrap();
    assert_eq!(attributes.len(), THREADS * 10);
    assert_eq!(fs.get_extended_attribute("/f", "attr-5-9").unwrap().content, vec![5]);
}

#[test]
fn test_link_members_stay_readable_while_group_grows() {
    let fs = Arc::new(ExtendedSupportFs::new(MemFs::new()));
    put(&*fs, "/a", b"data");
    fs.create_hard_link("/b", "/a").unwrap();
    fs.set_unix_permissions("/a", UnixPermissions::from_mode(0o640)).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..THREADS / 2)
        .map(|_| {
            let fs = Arc::clone(&fs);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut rounds = 0usize;
                while !done.load(Ordering::Acquire) || rounds == 0 {
                    assert_eq!(fs.get_metadata("/b").unwrap().size(), 4);
                    assert_eq!(fs.get_unix_permissions("/b").unwrap().mode(), 0o640);
                    if rounds % 8 == 0 {
                        assert_eq!(read_all(&*fs, "/b"), b"data");
                    }
                    rounds += 1;
                }
            })
        })
        .collect();

    for i in 0..200 {
        fs.create_hard_link(&format!("/c{}", i), "/a").unwrap();
        if i % 10 == 0 {
            fs.set_unix_permissions("/a", UnixPermissions::from_mode(0o640)).unwrap();
        }
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(read_all(&*fs, "/c199"), b"data");
    assert_eq!(fs.get_metadata("/c0").unwrap().size(), 4);
}
