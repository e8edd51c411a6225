/*!
 * Conformance Check
 * Exercises the capability contract against any FileSystem
 */

use thiserror::Error;
use tracing::{debug, info};

use super::traits::FileSystem;
use super::types::*;
use crate::monitoring::operation_span;

/// Scratch names used by the check; removed before and after
const TEST_FILE: &str = "/AFKpfkofkoFKOaortfeujiwqroujt";
const TEST_DIR: &str = "/DDSAJIDSAIDD";
const TEST_SUBDIR: &str = "/DDSAJIDSAIDD/SUBDIR";
const TEST_DIR_RENAMED: &str = "/FDAKFDA";
const TEST_FILE_MOVED: &str = "/FDAKFDA/SUBDIR/subdirRenamed";
const TEST_FILE_MOVED_BACK: &str = "/DDSAJIDSAIDD/SUBDIR/subdirRenamed";

const CONTENT: &[u8] = b"I am testing your file system. :)";

/// Size of the large file written in the last step (10 MiB)
const LARGE_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// First failed step of a conformance run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConformanceError {
    #[error("{step}: {source}")]
    Operation {
        step: &'static str,
        #[source]
        source: VfsError,
    },

    #[error("{step}: {detail}")]
    Mismatch { step: &'static str, detail: String },
}

impl ConformanceError {
    /// Name of the failed step
    pub fn step(&self) -> &'static str {
        match self {
            ConformanceError::Operation { step, .. } | ConformanceError::Mismatch { step, .. } => step,
        }
    }
}

pub type ConformanceResult<T = ()> = Result<T, ConformanceError>;

/// Attach a step name to a filesystem error
trait StepExt<T> {
    fn step(self, step: &'static str) -> ConformanceResult<T>;
}

impl<T> StepExt<T> for VfsResult<T> {
    fn step(self, step: &'static str) -> ConformanceResult<T> {
        self.map_err(|source| ConformanceError::Operation { step, source })
    }
}

fn mismatch(step: &'static str, detail: impl Into<String>) -> ConformanceError {
    ConformanceError::Mismatch {
        step,
        detail: detail.into(),
    }
}

fn ensure(condition: bool, step: &'static str, detail: impl FnOnce() -> String) -> ConformanceResult {
    if condition {
        Ok(())
    } else {
        Err(mismatch(step, detail()))
    }
}

/// Run the full check
///
/// Read-only volumes only get the root checks. The scratch entries are
/// created at the root and removed again.
pub fn check<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    let volume = fs.volume_name();
    let span = operation_span("conformance", &volume);
    let _entered = span.enter();
    info!(volume = %volume, file_system = %fs.file_system_name(), "running conformance check");
    check_root(fs)?;
    if fs.is_read_only() {
        return Ok(());
    }

    clean_up(fs)?;
    check_create_and_write(fs)?;
    check_directories_and_rename(fs)?;
    check_truncate_and_overwrite(fs)?;
    check_sparse_write(fs)?;
    check_block_counts(fs)?;
    delete_if_present(fs, TEST_FILE)?;
    check_large_file(fs)?;
    info!("conformance check passed");
    Ok(())
}

/// Root metadata, listing, and the operations the root refuses
pub fn check_root<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    fs.list_directory("/").step("list root")?;
    match fs.get_metadata("/").step("root metadata")? {
        Entity::Directory { path, .. } => {
            ensure(path == "/", "root metadata", || format!("root reports path {:?}", path))?;
        }
        other => return Err(mismatch("root metadata", format!("root is a {}", other.kind()))),
    }

    match fs.open_file("/", true, true) {
        Err(VfsError::NotAFile(_)) => {}
        Err(e) => return Err(mismatch("open root", format!("expected NotAFile, got {}", e))),
        Ok(handle) => {
            let _ = fs.close(&handle);
            return Err(mismatch("open root", "the root was opened as a file"));
        }
    }

    match fs.create_directory("/") {
        Err(VfsError::DestinationAlreadyExists(_)) => Ok(()),
        Err(e) => Err(mismatch(
            "create root",
            format!("expected DestinationAlreadyExists, got {}", e),
        )),
        Ok(()) => Err(mismatch("create root", "creating the root succeeded")),
    }
}

fn delete_if_present<F: FileSystem + ?Sized>(fs: &F, path: &'static str) -> ConformanceResult {
    if fs.path_exists(path) {
        fs.delete(path).step("clean up")?;
    }
    ensure(!fs.path_exists(path), "clean up", || format!("{} still exists", path))
}

fn clean_up<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    for path in [TEST_FILE, TEST_FILE_MOVED, TEST_FILE_MOVED_BACK, TEST_DIR, TEST_DIR_RENAMED] {
        delete_if_present(fs, path)?;
    }
    Ok(())
}

/// Read the whole file with one handle and compare, then again from offset 4
fn expect_content<F: FileSystem + ?Sized>(
    fs: &F,
    path: &str,
    expected: &[u8],
    step: &'static str,
) -> ConformanceResult {
    let handle = fs.open_file(path, true, true).step(step)?;
    let whole = read_exact(fs, &handle, 0, expected.len()).step(step);
    let tail = read_exact(fs, &handle, 4, expected.len().saturating_sub(4)).step(step);
    fs.close(&handle).step(step)?;

    let whole = whole?;
    ensure(whole == expected, step, || {
        format!("expected {} bytes {:?}, read {:?}", expected.len(), expected, whole)
    })?;
    let tail = tail?;
    ensure(tail == expected[4.min(expected.len())..], step, || {
        format!("reading from offset 4 returned {:?}", tail)
    })
}

/// Read until `len` bytes arrived or end of file
fn read_exact<F: FileSystem + ?Sized>(
    fs: &F,
    handle: &FileHandle,
    offset: u64,
    len: usize,
) -> VfsResult<Vec<u8>> {
    let mut content = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = fs.read(handle, &mut content[filled..], offset + filled as u64)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    content.truncate(filled);
    Ok(content)
}

fn expect_size<F: FileSystem + ?Sized>(fs: &F, path: &str, size: u64, step: &'static str) -> ConformanceResult {
    match fs.get_metadata(path).step(step)? {
        Entity::File { size: actual, .. } => ensure(actual == size, step, || {
            format!("expected {} bytes, metadata reports {}", size, actual)
        }),
        other => Err(mismatch(step, format!("{} is a {}", path, other.kind()))),
    }
}

fn check_create_and_write<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "create and write";
    fs.create_file(TEST_FILE).step(STEP)?;
    ensure(fs.path_exists(TEST_FILE), STEP, || format!("{} missing after create", TEST_FILE))?;

    let handle = fs.open_file(TEST_FILE, false, true).step(STEP)?;
    let written = fs
        .write(&handle, CONTENT, 0)
        .and_then(|()| fs.flush(&handle))
        .step(STEP);
    fs.close(&handle).step(STEP)?;
    written?;

    expect_size(fs, TEST_FILE, CONTENT.len() as u64, STEP)?;
    expect_content(fs, TEST_FILE, CONTENT, "read back")
}

fn check_directories_and_rename<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "directories";
    fs.create_directory(TEST_DIR).step(STEP)?;
    match fs.create_directory(TEST_DIR) {
        Err(VfsError::DestinationAlreadyExists(_)) => {}
        Err(e) => return Err(mismatch(STEP, format!("expected DestinationAlreadyExists, got {}", e))),
        Ok(()) => return Err(mismatch(STEP, "created an existing directory again")),
    }
    fs.create_directory(TEST_SUBDIR).step(STEP)?;

    rename(fs, TEST_DIR, TEST_DIR_RENAMED)?;
    rename(fs, TEST_FILE, TEST_FILE_MOVED)?;
    expect_content(fs, TEST_FILE_MOVED, CONTENT, "read after rename")?;
    rename(fs, TEST_DIR_RENAMED, TEST_DIR)?;
    rename(fs, TEST_FILE_MOVED_BACK, TEST_FILE)?;

    fs.delete_directory_recursively(TEST_DIR).step(STEP)?;
    ensure(!fs.path_exists(TEST_DIR), STEP, || format!("{} exists after delete", TEST_DIR))?;
    expect_content(fs, TEST_FILE, CONTENT, "read after rename")
}

fn rename<F: FileSystem + ?Sized>(fs: &F, source: &str, destination: &str) -> ConformanceResult {
    const STEP: &str = "rename";
    fs.rename(source, destination).step(STEP)?;
    ensure(fs.path_exists(destination), STEP, || {
        format!("{} missing after renaming {}", destination, source)
    })?;
    ensure(!fs.path_exists(source), STEP, || format!("{} still exists after rename", source))?;
    debug!(source, destination, "rename verified");
    Ok(())
}

fn check_truncate_and_overwrite<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "truncate";
    let handle = fs.open_file(TEST_FILE, true, true).step(STEP)?;
    let truncated = fs.set_length(&handle, 6).step(STEP);
    fs.close(&handle).step(STEP)?;
    truncated?;
    expect_content(fs, TEST_FILE, &CONTENT[..6], STEP)?;

    const OVERWRITE: &str = "overwrite at offset";
    let handle = fs.open_file(TEST_FILE, false, true).step(OVERWRITE)?;
    let written = fs.write(&handle, CONTENT, 4).step(OVERWRITE);
    fs.close(&handle).step(OVERWRITE)?;
    written?;

    let mut expected = CONTENT[..4].to_vec();
    expected.extend_from_slice(CONTENT);
    expect_content(fs, TEST_FILE, &expected, OVERWRITE)
}

fn check_sparse_write<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "sparse write";
    const DATA: [u8; 5] = [5, 6, 7, 8, 9];

    let handle = fs.open_file(TEST_FILE, false, true).step(STEP)?;
    let result = fs
        .set_length(&handle, 0)
        .and_then(|()| fs.write(&handle, &DATA, 2))
        .step(STEP);
    fs.close(&handle).step(STEP)?;
    result?;

    expect_size(fs, TEST_FILE, 7, STEP)?;
    expect_content(fs, TEST_FILE, &[0, 0, 5, 6, 7, 8, 9], STEP)
}

fn check_block_counts<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "block counts";
    let total = fs.total_block_count();
    let free = fs.free_block_count();
    let available = fs.free_block_available_count();

    ensure(total > 0, STEP, || "total block count is 0".to_string())?;
    ensure(free > 0, STEP, || "free block count is 0".to_string())?;
    ensure(available > 0, STEP, || "available block count is 0".to_string())?;
    ensure(available <= free, STEP, || {
        format!("{} blocks available but only {} free", available, free)
    })
}

/// Two scattered 512 KiB writes into a 10 MiB file, read back in one go
fn check_large_file<F: FileSystem + ?Sized>(fs: &F) -> ConformanceResult {
    const STEP: &str = "large file";
    const BLOCK: usize = 512 * 1024;

    let mut expected = vec![0u8; LARGE_FILE_SIZE as usize];
    fs.create_file(TEST_FILE).step(STEP)?;
    let handle = fs.open_file(TEST_FILE, true, true).step(STEP)?;

    let result = (|| {
        fs.set_length(&handle, LARGE_FILE_SIZE)?;
        for (round, position) in [(1u8, 3 * BLOCK + 17), (2u8, 11 * BLOCK + 4093)] {
            let block: Vec<u8> = (0..BLOCK).map(|i| (i as u8) ^ round.wrapping_mul(37)).collect();
            fs.write(&handle, &block, position as u64)?;
            expected[position..position + BLOCK].copy_from_slice(&block);
        }
        read_exact(fs, &handle, 0, expected.len())
    })()
    .step(STEP);
    fs.close(&handle).step(STEP)?;
    let actual = result?;

    ensure(actual == expected, STEP, || {
        let first = actual
            .iter()
            .zip(&expected)
            .position(|(a, e)| a != e)
            .unwrap_or(actual.len().min(expected.len()));
        format!("content differs at byte {} (read {} bytes)", first, actual.len())
    })?;
    fs.delete_file(TEST_FILE).step(STEP)
}
