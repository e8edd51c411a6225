/*!
 * Virtual Paths
 * Absolute, `/`-separated path helpers shared by all layers
 */

use std::path::Path;

/// Root of every virtual tree
pub const ROOT: &str = "/";

/// Normalize path (make absolute and clean)
///
/// Removes `.`, `..`, duplicate and trailing separators. Names are kept
/// verbatim otherwise, including reserved marker suffixes.
pub fn normalize(path: &str) -> String {
    let absolute = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    // Handles ., .. and repeated separators
    let cleaned = path_clean::clean(Path::new(&absolute));
    let cleaned = cleaned.to_string_lossy();
    if cleaned.is_empty() {
        ROOT.to_string()
    } else {
        cleaned.into_owned()
    }
}

/// True for the root path
#[inline]
pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Parent path of a normalized path, `None` for the root
pub fn parent(path: &str) -> Option<&str> {
    if is_root(path) {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last component of a normalized path, empty for the root
pub fn file_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a directory path and a single child name
pub fn join(directory: &str, name: &str) -> String {
    if directory.ends_with('/') {
        format!("{}{}", directory, name)
    } else {
        format!("{}/{}", directory, name)
    }
}

/// True if `path` equals `ancestor` or lies below it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// `path` moved from under `from` to under `to`, `None` if it is not inside
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if is_root(from) || !is_within(path, from) {
        return None;
    }
    Some(format!("{}{}", to, &path[from.len()..]))
}
