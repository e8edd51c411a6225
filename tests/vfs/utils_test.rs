/*!
 * Whole-File Helper Tests
 */

use layerfs::vfs::utils::{read_lines, read_text, read_whole, write_lines, write_text, write_whole};
use layerfs::vfs::{FileSystem, MemFs, VfsError};
use pretty_assertions::assert_eq;

#[test]
fn test_write_whole_replaces_content() {
    let fs = MemFs::new();
    write_whole(&fs, "/f", b"a much longer first version").unwrap();
    write_whole(&fs, "/f", b"short").unwrap();
    assert_eq!(read_whole(&fs, "/f").unwrap(), b"short");

    write_whole(&fs, "/f", b"").unwrap();
    assert_eq!(fs.get_metadata("/f").unwrap().size(), 0);
}

#[test]
fn test_lines_round_trip() {
    let fs = MemFs::new();
    write_lines(&fs, "/list", &["first", "", "third"]).unwrap();
    assert_eq!(read_text(&fs, "/list").unwrap(), "first\n\nthird\n");
    assert_eq!(read_lines(&fs, "/list").unwrap(), vec!["first", "", "third"]);

    write_lines::<_, &str>(&fs, "/empty", &[]).unwrap();
    assert!(read_lines(&fs, "/empty").unwrap().is_empty());
}

#[test]
fn test_text_is_lossy() {
    let fs = MemFs::new();
    write_whole(&fs, "/bin", &[b'o', b'k', 0xFF]).unwrap();
    assert_eq!(read_text(&fs, "/bin").unwrap(), "ok\u{FFFD}");
}

#[test]
fn test_errors_propagate() {
    let fs = MemFs::new();
    assert!(matches!(read_whole(&fs, "/missing"), Err(VfsError::PathNotFound(_))));
    assert!(matches!(write_text(&fs, "/no/parent", "x"), Err(VfsError::PathNotFound(_))));

    fs.create_directory("/dir").unwrap();
    assert!(matches!(read_whole(&fs, "/dir"), Err(VfsError::NotAFile(_))));
}

#[test]
fn test_large_content_spans_reads() {
    let fs = MemFs::new();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    write_whole(&fs, "/big", &content).unwrap();
    assert_eq!(read_whole(&fs, "/big").unwrap(), content);
}
