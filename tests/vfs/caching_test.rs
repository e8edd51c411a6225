/*!
 * Caching Tests
 * Write coalescing and read window behavior over a counting inner store
 */

use layerfs::vfs::{CacheConfig, CachingFs, FileSystem, MemFs, VfsError};
use pretty_assertions::assert_eq;

use super::common::{put, read_all, CountingFs};

fn counting(cache: usize) -> CachingFs<CountingFs> {
    let fs = CachingFs::with_config(CountingFs::new(), CacheConfig::uniform(cache));
    fs.create_file("/f").unwrap();
    fs
}

#[test]
fn test_contiguous_writes_coalesce_into_one_commit() {
    let fs = counting(4096);
    let handle = fs.open_file("/f", false, true).unwrap();

    let block = [0xABu8; 400];
    for i in 0..10u64 {
        fs.write(&handle, &block, i * 400).unwrap();
    }
    assert_eq!(fs.inner().writes(), 0);

    fs.flush(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 1);
    fs.close(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 1);
    assert_eq!(fs.get_metadata("/f").unwrap().size(), 4000);
}

#[test]
fn test_overflowing_write_forces_second_commit() {
    let fs = counting(4096);
    let handle = fs.open_file("/f", false, true).unwrap();

    let block = [0x11u8; 400];
    for i in 0..11u64 {
        fs.write(&handle, &block, i * 400).unwrap();
    }
    assert_eq!(fs.inner().writes(), 1);

    fs.close(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 2);
    assert_eq!(read_all(&fs, "/f"), vec![0x11u8; 4400]);
}

#[test]
fn test_non_contiguous_write_commits_buffer() {
    let fs = counting(4096);
    let handle = fs.open_file("/f", false, true).unwrap();

    fs.write(&handle, b"head", 0).unwrap();
    fs.write(&handle, b"tail", 100).unwrap();
    assert_eq!(fs.inner().writes(), 1);
    fs.write(&handle, b"!", 104).unwrap();
    assert_eq!(fs.inner().writes(), 1);
    fs.close(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 2);

    let content = read_all(&fs, "/f");
    assert_eq!(content.len(), 105);
    assert_eq!(&content[..4], b"head");
    assert_eq!(&content[100..], b"tail!");
}

#[test]
fn test_oversized_write_goes_straight_through() {
    let fs = counting(64);
    let handle = fs.open_file("/f", false, true).unwrap();

    fs.write(&handle, &[1u8; 10], 0).unwrap();
    fs.write(&handle, &[2u8; 100], 10).unwrap();
    // Pending 10 bytes, then the large write itself
    assert_eq!(fs.inner().writes(), 2);
    fs.close(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 2);
    assert_eq!(fs.get_metadata("/f").unwrap().size(), 110);
}

#[test]
fn test_read_window_serves_repeated_reads() {
    let inner = CountingFs::new();
    put(&inner, "/f", &(0..=255u8).collect::<Vec<_>>());
    let fs = CachingFs::with_config(inner, CacheConfig::uniform(128));

    let handle = fs.open_file("/f", true, false).unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(fs.read(&handle, &mut buf, 0).unwrap(), 16);
    assert_eq!(fs.read(&handle, &mut buf, 16).unwrap(), 16);
    assert_eq!(fs.read(&handle, &mut buf, 100).unwrap(), 16);
    assert_eq!(buf[0], 100);
    assert_eq!(fs.inner().reads(), 1);

    // Outside the window: one fetch
    assert_eq!(fs.read(&handle, &mut buf, 200).unwrap(), 16);
    assert_eq!(buf[0], 200);
    assert_eq!(fs.inner().reads(), 2);

    // Near the end the fetch is short and the answer trimmed
    assert_eq!(fs.read(&handle, &mut buf, 250).unwrap(), 6);
    assert_eq!(&buf[..6], &[250, 251, 252, 253, 254, 255]);
    fs.close(&handle).unwrap();
}

#[test]
fn test_large_read_bypasses_window() {
    let inner = CountingFs::new();
    put(&inner, "/f", &[9u8; 300]);
    let fs = CachingFs::with_config(inner, CacheConfig::uniform(64));

    let handle = fs.open_file("/f", true, false).unwrap();
    let mut buf = [0u8; 64];
    assert_eq!(fs.read(&handle, &mut buf, 0).unwrap(), 64);
    assert_eq!(fs.read(&handle, &mut buf, 0).unwrap(), 64);
    assert_eq!(fs.inner().reads(), 2);
    fs.close(&handle).unwrap();
}

#[test]
fn test_set_length_commits_and_invalidates() {
    let fs = CachingFs::with_config(MemFs::new(), CacheConfig::uniform(256));
    put(&fs, "/f", b"0123456789");

    let handle = fs.open_file("/f", true, true).unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(fs.read(&handle, &mut buf, 0).unwrap(), 10);

    fs.write(&handle, b"ab", 10).unwrap();
    fs.set_length(&handle, 4).unwrap();
    let mut buf = [0u8; 12];
    assert_eq!(fs.read(&handle, &mut buf, 0).unwrap(), 4);
    assert_eq!(&buf[..4], b"0123");
    fs.close(&handle).unwrap();

    assert_eq!(read_all(&fs, "/f"), b"0123");
}

#[test]
fn test_before_unmounting_commits_pending_writes() {
    let fs = counting(1024);
    let handle = fs.open_file("/f", false, true).unwrap();
    fs.write(&handle, b"pending", 0).unwrap();
    assert_eq!(fs.inner().writes(), 0);

    fs.before_unmounting();
    assert_eq!(fs.inner().writes(), 1);
    fs.close(&handle).unwrap();
    assert_eq!(fs.inner().writes(), 1);
}

#[test]
fn test_closed_handle_rejected() {
    let fs = counting(1024);
    let handle = fs.open_file("/f", true, true).unwrap();
    fs.close(&handle).unwrap();

    assert!(matches!(fs.write(&handle, b"x", 0), Err(VfsError::AccessDenied(_))));
    assert!(matches!(fs.read(&handle, &mut [0u8; 1], 0), Err(VfsError::AccessDenied(_))));
    assert!(matches!(fs.close(&handle), Err(VfsError::AccessDenied(_))));
    assert_eq!(fs.cached_handles(), 0);
}

#[test]
fn test_read_only_handle_cannot_buffer_writes() {
    let fs = counting(1024);
    put(&fs, "/f", b"abc");
    let writes = fs.inner().writes();

    let reader = fs.open_file("/f", true, false).unwrap();
    assert!(matches!(fs.write(&reader, b"xyz", 0), Err(VfsError::AccessDenied(_))));
    assert!(matches!(fs.set_length(&reader, 0), Err(VfsError::AccessDenied(_))));
    fs.close(&reader).unwrap();

    assert_eq!(fs.inner().writes(), writes);
    assert_eq!(read_all(&fs, "/f"), b"abc");
}

#[test]
fn test_inherits_inner_block_size() {
    let fs = CachingFs::new(MemFs::new());
    assert_eq!(fs.read_cache_size(), 16 * 1024);
    assert_eq!(fs.write_cache_size(), 16 * 1024);
    assert_eq!(fs.block_size(), 16 * 1024);
}
