/*!
 * Merge Tests
 * Routing rules of the master/slave union
 */

use layerfs::vfs::{
    ExtendedAttribute, ExtendedSupportFs, FileSystem, MemFs, MemFsConfig, MergeFs, Side, VfsError,
};
use pretty_assertions::assert_eq;

use super::common::{put, read_all};

fn merged() -> MergeFs<MemFs, MemFs> {
    let master = MemFs::new();
    let slave = MemFs::new();
    put(&master, "/master.txt", b"m");
    put(&slave, "/slave.txt", b"s");
    slave.create_directory("/shared").unwrap();
    master.create_directory("/shared").unwrap();
    put(&slave, "/shared/from-slave", b"1");
    put(&master, "/shared/from-master", b"2");
    MergeFs::new(master, slave)
}

#[test]
fn test_listing_concatenates_master_first() {
    let fs = merged();
    let names: Vec<String> = fs
        .list_directory("/shared")
        .unwrap()
        .iter()
        .map(|e| e.file_name().to_string())
        .collect();
    assert_eq!(names, vec!["from-master".to_string(), "from-slave".to_string()]);

    fs.slave().create_directory("/slave-only").unwrap();
    assert_eq!(fs.list_directory("/slave-only").unwrap().len(), 0);
    assert!(matches!(fs.list_directory("/nowhere"), Err(VfsError::PathNotFound(_))));
}

#[test]
fn test_lookups_fall_through() {
    let fs = merged();
    assert_eq!(fs.get_metadata("/slave.txt").unwrap().size(), 1);
    assert!(fs.path_exists("/master.txt"));
    assert!(fs.path_exists("/slave.txt"));
    assert!(!fs.path_exists("/none"));
    assert_eq!(read_all(&fs, "/slave.txt"), b"s");
    assert_eq!(read_all(&fs, "/master.txt"), b"m");
}

#[test]
fn test_creation_targets_master() {
    let fs = merged();
    fs.create_file("/new").unwrap();
    assert!(fs.master().path_exists("/new"));
    assert!(!fs.slave().path_exists("/new"));

    // Parent only on the slave: creation still goes to the master and fails there
    fs.slave().create_directory("/sdir").unwrap();
    assert!(matches!(fs.create_file("/sdir/x"), Err(VfsError::PathNotFound(_))));
    assert!(matches!(fs.create_hard_link("/h", "/new"), Err(VfsError::UnsupportedFeature(_))));
}

#[test]
fn test_handles_stay_on_their_side() {
    let fs = merged();
    let handle = fs.open_file("/slave.txt", true, true).unwrap();
    assert_eq!(MergeFs::<MemFs, MemFs>::side_of(&handle), Some(Side::Slave));

    fs.write(&handle, b"updated", 0).unwrap();
    fs.flush(&handle).unwrap();
    fs.close(&handle).unwrap();

    assert_eq!(read_all(fs.slave(), "/slave.txt"), b"updated");
    assert!(!fs.master().path_exists("/slave.txt"));
}

#[test]
fn test_delete_and_rename_fall_back_on_any_failure() {
    let fs = merged();
    fs.delete("/slave.txt").unwrap();
    assert!(!fs.slave().path_exists("/slave.txt"));

    fs.rename("/shared/from-slave", "/shared/moved").unwrap();
    assert!(fs.slave().path_exists("/shared/moved"));

    // Missing on both sides: the master's error is reported
    assert!(matches!(fs.delete_file("/ghost"), Err(VfsError::PathNotFound(_))));
}

#[test]
fn test_master_error_kept_when_slave_lacks_path() {
    let fs = merged();
    // The master refuses (directory), the slave does not know the path
    fs.master().create_directory("/only-master-dir").unwrap();
    assert!(matches!(fs.delete_file("/only-master-dir"), Err(VfsError::NotAFile(_))));
}

#[test]
fn test_attributes_fall_through_unsupported() {
    let master = MemFs::new();
    let slave = ExtendedSupportFs::new(MemFs::new());
    put(&master, "/m", b"");
    put(&slave, "/s", b"");
    let fs = MergeFs::new(master, slave);

    // Master has no attribute support, the slave emulates it
    fs.set_extended_attribute("/s", ExtendedAttribute::new("k", b"v".to_vec()))
        .unwrap();
    assert_eq!(fs.get_extended_attribute("/s", "k").unwrap().content, b"v");
    assert!(matches!(
        fs.set_extended_attribute("/m", ExtendedAttribute::new("k", b"v".to_vec())),
        Err(VfsError::PathNotFound(_))
    ));
}

#[test]
fn test_volume_rules() {
    let master = MemFs::with_config(MemFsConfig {
        max_files: Some(100),
        volume_name: "Master".to_string(),
        ..MemFsConfig::default()
    });
    let slave = MemFs::with_config(MemFsConfig {
        max_files: Some(10),
        case_sensitive: false,
        ..MemFsConfig::default()
    });
    put(&master, "/a", b"");
    put(&slave, "/b", b"");
    put(&slave, "/c", b"");
    let fs = MergeFs::new(master, slave);

    assert_eq!(fs.volume_name(), "Master");
    assert!(fs.is_case_sensitive());
    assert_eq!(fs.files_free_count(), 8);
    assert_eq!(fs.total_files_count(), 3);
    assert!(fs.supports_unicode_filenames());
    assert!(!fs.is_compressed());
    assert_eq!(fs.block_size(), fs.master().block_size());
}
