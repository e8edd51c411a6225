/*!
 * Whole-File Helpers
 * Read and replace complete file contents through any FileSystem
 */

use super::traits::FileSystem;
use super::types::{VfsError, VfsResult};

/// Read buffer size for whole-file reads
const READ_STEP: usize = 64 * 1024;

/// Read a file fully into memory
pub fn read_whole<F: FileSystem + ?Sized>(fs: &F, path: &str) -> VfsResult<Vec<u8>> {
    let expected = fs.get_metadata(path)?.size();
    let handle = fs.open_file(path, true, false)?;

    let mut content = Vec::with_capacity(expected as usize);
    let mut buffer = vec![0u8; READ_STEP];
    let result = loop {
        match fs.read(&handle, &mut buffer, content.len() as u64) {
            Ok(0) => break Ok(()),
            Ok(n) => content.extend_from_slice(&buffer[..n]),
            Err(e) => break Err(e),
        }
    };

    let closed = fs.close(&handle);
    result?;
    closed?;
    Ok(content)
}

/// Read a UTF-8 text file; invalid sequences are replaced
pub fn read_text<F: FileSystem + ?Sized>(fs: &F, path: &str) -> VfsResult<String> {
    let bytes = read_whole(fs, path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read a text file split into lines
///
/// Empty lines in the middle are kept; a final newline does not produce an
/// extra empty line.
pub fn read_lines<F: FileSystem + ?Sized>(fs: &F, path: &str) -> VfsResult<Vec<String>> {
    Ok(read_text(fs, path)?.lines().map(str::to_string).collect())
}

/// Replace a file's content: delete if present, create, write, close
pub fn write_whole<F: FileSystem + ?Sized>(fs: &F, path: &str, content: &[u8]) -> VfsResult<()> {
    if fs.path_exists(path) {
        fs.delete(path)?;
    }
    match fs.create_file(path) {
        Ok(()) | Err(VfsError::DestinationAlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }

    let handle = fs.open_file(path, false, true)?;
    let written = if content.is_empty() {
        Ok(())
    } else {
        fs.write(&handle, content, 0)
    };
    let closed = fs.close(&handle);
    written?;
    closed
}

pub fn write_text<F: FileSystem + ?Sized>(fs: &F, path: &str, content: &str) -> VfsResult<()> {
    write_whole(fs, path, content.as_bytes())
}

/// Write each line followed by `\n`
pub fn write_lines<F, S>(fs: &F, path: &str, lines: &[S]) -> VfsResult<()>
where
    F: FileSystem + ?Sized,
    S: AsRef<str>,
{
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    write_text(fs, path, &text)
}
