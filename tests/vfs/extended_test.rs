/*!
 * Extended Support Tests
 * Locks, hard links, symbolic links, permissions and extended attributes
 */

use std::sync::Arc;

use layerfs::vfs::{
    Entity, ExtendedAttribute, ExtendedConfig, ExtendedSupportFs, FileSystem, InMemoryStore, MemFs,
    MetadataStore, SiblingFileStore, UnixPermissions, VfsError, WindowsAttributes,
};
use pretty_assertions::assert_eq;

use super::common::{put, read_all};

fn fs() -> ExtendedSupportFs<MemFs> {
    ExtendedSupportFs::new(MemFs::new())
}

// ============================================================================
// Byte-range locks
// ============================================================================

#[test]
fn test_lock_arbitration() {
    let fs = fs();
    put(&fs, "/f", b"0123456789");

    let a = fs.open_file("/f", true, true).unwrap();
    let b = fs.open_file("/f", true, true).unwrap();

    fs.lock_file(&a, 1, 5).unwrap();
    assert_eq!(fs.lock_file(&b, 2, 8), Err(VfsError::AlreadyLocked));
    assert_eq!(fs.write(&b, b"x", 1), Err(VfsError::PartIsLocked));
    fs.write(&a, b"y", 1).unwrap();

    fs.unlock_file(&a, 1, 5).unwrap();
    fs.lock_file(&b, 1, 5).unwrap();
    assert_eq!(fs.write(&a, b"z", 3), Err(VfsError::PartIsLocked));

    fs.close(&a).unwrap();
    fs.close(&b).unwrap();
}

#[test]
fn test_write_spanning_own_and_foreign_locks() {
    let fs = fs();
    put(&fs, "/f", b"0123456789");

    let a = fs.open_file("/f", true, true).unwrap();
    let b = fs.open_file("/f", true, true).unwrap();
    fs.lock_file(&a, 0, 5).unwrap();
    fs.lock_file(&b, 5, 5).unwrap();

    assert_eq!(fs.write(&a, b"xxxxx", 3), Err(VfsError::PartIsLocked));
    assert_eq!(fs.write(&b, b"yy", 4), Err(VfsError::PartIsLocked));
    fs.write(&a, b"xxxxx", 0).unwrap();
    fs.write(&b, b"yyyyy", 5).unwrap();

    fs.close(&a).unwrap();
    fs.close(&b).unwrap();
    assert_eq!(read_all(&fs, "/f"), b"xxxxxyyyyy");
}

#[test]
fn test_same_handle_overlap_conflicts() {
    let fs = fs();
    put(&fs, "/f", b"data");
    let a = fs.open_file("/f", true, true).unwrap();

    fs.lock_file(&a, 0, 4).unwrap();
    assert_eq!(fs.lock_file(&a, 0, 4), Err(VfsError::AlreadyLocked));
    // Adjacent ranges do not overlap
    fs.lock_file(&a, 4, 4).unwrap();
    assert_eq!(fs.held_locks("/f"), 2);
    fs.close(&a).unwrap();
}

#[test]
fn test_unlock_rules() {
    let fs = fs();
    put(&fs, "/f", b"data");
    let a = fs.open_file("/f", true, true).unwrap();
    let b = fs.open_file("/f", true, true).unwrap();

    // Nothing to unlock is fine
    fs.unlock_file(&b, 0, 10).unwrap();

    fs.lock_file(&a, 0, 2).unwrap();
    assert!(matches!(fs.unlock_file(&b, 0, 2), Err(VfsError::AccessDenied(_))));
    assert_eq!(fs.held_locks("/f"), 1);

    fs.write(&b, b"zz", 2).unwrap();
    fs.close(&b).unwrap();
    fs.close(&a).unwrap();
}

#[test]
fn test_locks_released_on_close() {
    let fs = fs();
    put(&fs, "/f", b"data");
    let a = fs.open_file("/f", true, true).unwrap();
    fs.lock_file(&a, 0, 4).unwrap();
    fs.close(&a).unwrap();
    assert_eq!(fs.held_locks("/f"), 0);

    let b = fs.open_file("/f", true, true).unwrap();
    fs.lock_file(&b, 0, 4).unwrap();
    fs.close(&b).unwrap();
}

// ============================================================================
// Hard links
// ============================================================================

#[test]
fn test_hard_link_equivalence() {
    let fs = fs();
    put(&fs, "/a", b"data");
    fs.create_hard_link("/b", "/a").unwrap();

    let b = fs.get_metadata("/b").unwrap();
    assert_eq!(b.path(), "/b");
    assert_eq!(b.size(), fs.get_metadata("/a").unwrap().size());
    assert_eq!(read_all(&fs, "/b"), b"data");

    let handle = fs.open_file("/b", true, true).unwrap();
    fs.write(&handle, b"DATA!", 0).unwrap();
    fs.close(&handle).unwrap();
    assert_eq!(read_all(&fs, "/a"), b"DATA!");
    assert_eq!(fs.get_metadata("/b").unwrap().size(), 5);

    fs.delete_file("/a").unwrap();
    assert!(!fs.path_exists("/a"));
    assert_eq!(read_all(&fs, "/b"), b"DATA!");

    // Group dissolved: /b is an ordinary file again
    let names: Vec<String> = fs
        .inner()
        .list_directory("/")
        .unwrap()
        .iter()
        .map(|e| e.file_name().to_string())
        .collect();
    assert_eq!(names, vec!["b".to_string()]);
}

#[test]
fn test_hard_link_errors() {
    let fs = fs();
    put(&fs, "/a", b"data");
    fs.create_directory("/d").unwrap();

    assert!(matches!(fs.create_hard_link("/a", "/a"), Err(VfsError::SourceAlreadyExists(_))));
    assert!(matches!(fs.create_hard_link("/x", "/missing"), Err(VfsError::PathNotFound(_))));
    assert!(matches!(fs.create_hard_link("/x", "/d"), Err(VfsError::NotAFile(_))));
    assert!(!fs.path_exists("/x"));
}

#[test]
fn test_three_member_group() {
    let fs = fs();
    put(&fs, "/a", b"shared");
    fs.create_hard_link("/b", "/a").unwrap();
    fs.create_hard_link("/c", "/b").unwrap();

    fs.set_unix_permissions("/c", UnixPermissions::from_mode(0o600)).unwrap();
    assert_eq!(fs.get_unix_permissions("/a").unwrap().mode(), 0o600);

    // Non-canonical member leaves quietly
    fs.delete_file("/b").unwrap();
    assert_eq!(read_all(&fs, "/c"), b"shared");

    // Canonical member leaves; content and permissions move to /c
    fs.delete_file("/a").unwrap();
    assert_eq!(read_all(&fs, "/c"), b"shared");
    assert_eq!(fs.get_unix_permissions("/c").unwrap().mode(), 0o600);
    assert_eq!(fs.list_directory("/").unwrap().len(), 1);
}

#[test]
fn test_rename_grouped_member() {
    let fs = fs();
    put(&fs, "/a", b"data");
    fs.create_hard_link("/b", "/a").unwrap();

    fs.rename("/b", "/renamed").unwrap();
    assert_eq!(read_all(&fs, "/renamed"), b"data");

    let handle = fs.open_file("/renamed", false, true).unwrap();
    fs.write(&handle, b"more", 4).unwrap();
    fs.close(&handle).unwrap();
    assert_eq!(read_all(&fs, "/a"), b"datamore");
}

fn layers() -> Vec<ExtendedSupportFs<MemFs>> {
    vec![
        fs(),
        ExtendedSupportFs::with_store(
            Arc::new(MemFs::new()),
            Arc::new(InMemoryStore::new()),
            ExtendedConfig::default(),
        ),
    ]
}

#[test]
fn test_directory_rename_keeps_groups_intact() {
    for fs in layers() {
        put(&fs, "/a", b"data");
        fs.create_directory("/d").unwrap();
        fs.create_hard_link("/d/b", "/a").unwrap();
        put(&fs, "/d/x", b"inner");
        fs.create_hard_link("/y", "/d/x").unwrap();

        fs.rename("/d", "/e").unwrap();

        // Member moved, canonical stayed
        assert_eq!(read_all(&fs, "/e/b"), b"data");
        let handle = fs.open_file("/e/b", false, true).unwrap();
        fs.write(&handle, b"more", 4).unwrap();
        fs.close(&handle).unwrap();
        assert_eq!(read_all(&fs, "/a"), b"datamore");

        // Canonical moved, member stayed
        assert_eq!(read_all(&fs, "/y"), b"inner");
        let handle = fs.open_file("/y", false, true).unwrap();
        fs.write(&handle, b"!", 5).unwrap();
        fs.close(&handle).unwrap();
        assert_eq!(read_all(&fs, "/e/x"), b"inner!");
        assert_eq!(fs.get_metadata("/y").unwrap().size(), 6);

        // Groups still dissolve through their new paths
        fs.delete_file("/e/b").unwrap();
        fs.delete_file("/e/x").unwrap();
        assert_eq!(read_all(&fs, "/a"), b"datamore");
        assert_eq!(read_all(&fs, "/y"), b"inner!");
    }
}

#[test]
fn test_directory_delete_hands_content_to_outside_member() {
    for fs in layers() {
        fs.create_directory("/d").unwrap();
        put(&fs, "/d/x", b"keep");
        fs.create_hard_link("/y", "/d/x").unwrap();
        fs.create_hard_link("/d/z", "/d/x").unwrap();
        fs.set_unix_permissions("/y", UnixPermissions::from_mode(0o640)).unwrap();

        fs.delete_directory_recursively("/d").unwrap();

        assert!(!fs.path_exists("/d"));
        assert_eq!(read_all(&fs, "/y"), b"keep");
        assert_eq!(fs.get_unix_permissions("/y").unwrap().mode(), 0o640);

        let handle = fs.open_file("/y", false, true).unwrap();
        fs.write(&handle, b"!", 4).unwrap();
        fs.close(&handle).unwrap();
        assert_eq!(fs.get_metadata("/y").unwrap().size(), 5);
        assert_eq!(fs.list_directory("/").unwrap().len(), 1);
    }
}

#[test]
fn test_locks_follow_canonical_path() {
    let fs = fs();
    put(&fs, "/a", b"0123456789");
    fs.create_hard_link("/b", "/a").unwrap();

    let via_a = fs.open_file("/a", true, true).unwrap();
    let via_b = fs.open_file("/b", true, true).unwrap();
    fs.lock_file(&via_b, 0, 5).unwrap();
    assert_eq!(fs.held_locks("/a"), 1);
    assert_eq!(fs.write(&via_a, b"x", 2), Err(VfsError::PartIsLocked));

    fs.close(&via_b).unwrap();
    assert_eq!(fs.held_locks("/a"), 0);
    fs.write(&via_a, b"x", 2).unwrap();
    fs.close(&via_a).unwrap();
}

// ============================================================================
// Symbolic links
// ============================================================================

#[test]
fn test_symbolic_link_listing() {
    let fs = fs();
    put(&fs, "/target", b"t");
    fs.create_symbolic_link("/link", "/target").unwrap();

    let entities = fs.list_directory("/").unwrap();
    assert_eq!(entities.len(), 2);
    let link = entities.iter().find(|e| e.path() == "/link").unwrap();
    assert!(matches!(
        link,
        Entity::SymbolicLink { destination, .. } if destination == "/target"
    ));
}

#[test]
fn test_rename_moves_symbolic_link() {
    let fs = fs();
    fs.create_symbolic_link("/link", "/target").unwrap();
    fs.rename("/link", "/moved").unwrap();

    assert!(fs.get_metadata("/moved").unwrap().is_symbolic_link());
    assert!(!fs.inner().path_exists("/linkEXTENDED_$$SYMLINK"));
}

// ============================================================================
// Permissions and attributes
// ============================================================================

#[test]
fn test_marker_lines_layout() {
    let fs = fs();
    fs.create_file("/f").unwrap();
    fs.set_unix_permissions("/f", UnixPermissions::new(0o754, 1000, 100))
        .unwrap();
    fs.set_windows_attributes("/f", WindowsAttributes::from_bits(0x22))
        .unwrap();

    let lines = layerfs::vfs::utils::read_lines(fs.inner(), "/fEXTENDED_$$PERMISSIONS").unwrap();
    assert_eq!(lines, vec!["754", "1000", "100", "34"]);
    assert_eq!(fs.get_unix_permissions("/f").unwrap(), UnixPermissions::new(0o754, 1000, 100));
    assert_eq!(fs.get_windows_attributes("/f").unwrap().to_bits(), 0x22);
}

#[test]
fn test_extended_attributes() {
    let fs = fs();
    fs.create_file("/f").unwrap();

    assert!(fs.list_extended_attributes("/f").unwrap().is_empty());

    fs.set_extended_attribute("/f", ExtendedAttribute::new("TEST", vec![1, 2, 3]))
        .unwrap();
    assert_eq!(fs.get_extended_attribute("/f", "TEST").unwrap().content, vec![1, 2, 3]);

    fs.set_extended_attribute("/f", ExtendedAttribute::new("TEST", vec![4]))
        .unwrap();
    assert_eq!(fs.list_extended_attributes("/f").unwrap(), vec![ExtendedAttribute::new("TEST", vec![4])]);

    fs.remove_extended_attribute("/f", "TEST").unwrap();
    assert!(matches!(
        fs.get_extended_attribute("/f", "TEST"),
        Err(VfsError::AttributeNotFound(_))
    ));
    assert!(matches!(
        fs.remove_extended_attribute("/f", "NEVER"),
        Err(VfsError::AttributeNotFound(_))
    ));
    assert!(!fs.inner().path_exists("/fEXTENDED_$$ATTRIBUTES"));
}

#[test]
fn test_attribute_name_validation() {
    let fs = fs();
    fs.create_file("/f").unwrap();
    assert!(matches!(
        fs.set_extended_attribute("/f", ExtendedAttribute::new("a/b", vec![])),
        Err(VfsError::AccessDenied(_))
    ));
    assert!(matches!(
        fs.set_extended_attribute("/f", ExtendedAttribute::new("", vec![])),
        Err(VfsError::AccessDenied(_))
    ));
    assert!(matches!(
        fs.list_extended_attributes("/missing"),
        Err(VfsError::PathNotFound(_))
    ));
}

#[test]
fn test_delete_removes_all_markers() {
    let fs = fs();
    fs.create_file("/f").unwrap();
    fs.set_unix_permissions("/f", UnixPermissions::from_mode(0o600)).unwrap();
    fs.set_extended_attribute("/f", ExtendedAttribute::new("one", b"1".to_vec()))
        .unwrap();
    fs.set_extended_attribute("/f", ExtendedAttribute::new("two", b"2".to_vec()))
        .unwrap();

    fs.delete_file("/f").unwrap();
    assert!(fs.inner().list_directory("/").unwrap().is_empty());

    // A new file under the same name starts clean
    fs.create_file("/f").unwrap();
    assert!(fs.list_extended_attributes("/f").unwrap().is_empty());
    assert_eq!(fs.get_unix_permissions("/f").unwrap(), UnixPermissions::default_file());
}

#[test]
fn test_directory_delete_and_rename_with_in_memory_store() {
    let inner = Arc::new(MemFs::new());
    let store = Arc::new(InMemoryStore::new());
    let fs = ExtendedSupportFs::with_store(
        Arc::clone(&inner),
        Arc::clone(&store) as Arc<dyn MetadataStore>,
        ExtendedConfig::default(),
    );

    fs.create_directory("/d").unwrap();
    fs.create_file("/d/f").unwrap();
    fs.set_unix_permissions("/d/f", UnixPermissions::from_mode(0o700)).unwrap();

    fs.rename("/d", "/e").unwrap();
    assert_eq!(fs.get_unix_permissions("/e/f").unwrap().mode(), 0o700);

    fs.delete_directory_recursively("/e").unwrap();
    assert!(store.is_empty());
}

#[test]
fn test_detached_sibling_store() {
    let inner = Arc::new(MemFs::new());
    let side = Arc::new(MemFs::new());
    let fs = ExtendedSupportFs::with_store(
        Arc::clone(&inner),
        Arc::new(SiblingFileStore::detached(Arc::clone(&side))),
        ExtendedConfig::default(),
    );

    fs.create_directory("/d").unwrap();
    fs.create_file("/d/f").unwrap();
    fs.set_extended_attribute("/d/f", ExtendedAttribute::new("k", b"v".to_vec()))
        .unwrap();

    assert_eq!(inner.list_directory("/d").unwrap().len(), 1);
    assert!(side.path_exists("/d/fEXTENDED_$$ATTRIBUTES"));
    assert_eq!(fs.get_extended_attribute("/d/f", "k").unwrap().content, b"v");
}
