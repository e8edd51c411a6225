/*!
 * Metadata Side-Store
 * Where the extended-support layer keeps emulated metadata
 */

use ahash::RandomState;
use dashmap::DashMap;
use std::borrow::Cow;
use std::sync::Arc;

use super::super::paths;
use super::super::traits::FileSystem;
use super::super::types::{Entity, VfsError, VfsResult};
use super::super::utils;
use crate::core::limits::{ATTRIBUTES_MARKER, HARDLINK_MARKER, PERMISSIONS_MARKER, SYMLINK_MARKER};

/// Kind of record kept for a path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    /// Unix permissions and Windows attributes, four lines
    Permissions,
    /// Symbolic link destination
    SymbolicLink,
    /// Hard-link group, canonical member first
    HardLink,
    /// Names of the path's extended attributes, one per line
    AttributeIndex,
    /// Content of one extended attribute
    Attribute(String),
}

impl MarkerKind {
    /// Sibling file suffix for this kind
    pub fn suffix(&self) -> Cow<'static, str> {
        match self {
            MarkerKind::Permissions => Cow::Borrowed(PERMISSIONS_MARKER),
            MarkerKind::SymbolicLink => Cow::Borrowed(SYMLINK_MARKER),
            MarkerKind::HardLink => Cow::Borrowed(HARDLINK_MARKER),
            MarkerKind::AttributeIndex => Cow::Borrowed(ATTRIBUTES_MARKER),
            MarkerKind::Attribute(name) => Cow::Owned(format!("{}_{}", ATTRIBUTES_MARKER, name)),
        }
    }
}

/// Side-store key: a normalized path plus the record kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerKey {
    pub path: String,
    pub kind: MarkerKind,
}

impl MarkerKey {
    pub fn new(path: impl Into<String>, kind: MarkerKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Same kind, different path
    pub fn moved_to(&self, path: impl Into<String>) -> Self {
        Self::new(path, self.kind.clone())
    }
}

/// Key-value store for emulated metadata
///
/// Absence of a record is not an error: `load` returns `None` and `remove`
/// returns `false`. Errors are reserved for the store itself failing.
pub trait MetadataStore: Send + Sync {
    fn load(&self, key: &MarkerKey) -> VfsResult<Option<Vec<u8>>>;

    /// Create or replace a record
    fn store(&self, key: &MarkerKey, content: &[u8]) -> VfsResult<()>;

    /// Remove a record; `false` if there was none
    fn remove(&self, key: &MarkerKey) -> VfsResult<bool>;

    fn contains(&self, key: &MarkerKey) -> bool {
        matches!(self.load(key), Ok(Some(_)))
    }

    /// Move a record to another key, replacing whatever is there
    ///
    /// Returns `false` if the source record did not exist.
    fn rename(&self, from: &MarkerKey, to: &MarkerKey) -> VfsResult<bool> {
        let Some(content) = self.load(from)? else {
            return Ok(false);
        };
        self.store(to, &content)?;
        self.remove(from)?;
        Ok(true)
    }

    /// Drop every record at or below a deleted directory
    fn remove_tree(&self, path: &str) -> VfsResult<()>;

    /// Rebase every record at or below a renamed directory
    fn rename_tree(&self, from: &str, to: &str) -> VfsResult<()>;

    /// Paths at or below `directory` that hold a record of `kind`
    fn paths_with(&self, directory: &str, kind: &MarkerKind) -> VfsResult<Vec<String>>;
}

/// Read a record as newline-separated lines
pub fn load_lines<S: MetadataStore + ?Sized>(store: &S, key: &MarkerKey) -> VfsResult<Option<Vec<String>>> {
    Ok(store.load(key)?.map(|bytes| {
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }))
}

/// Write lines, each terminated by `\n`
pub fn store_lines<S, L>(store: &S, key: &MarkerKey, lines: &[L]) -> VfsResult<()>
where
    S: MetadataStore + ?Sized,
    L: AsRef<str>,
{
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    store.store(key, text.as_bytes())
}

/// Hidden sibling files in a filesystem
///
/// A record for `/dir/file` lives in `/dir/file<suffix>`. By default the
/// files sit next to the real entries in the wrapped filesystem, so they
/// move and vanish together with their directory. A detached store keeps
/// them in a separate filesystem and mirrors the directory structure there
/// on demand.
pub struct SiblingFileStore<S: FileSystem + ?Sized> {
    fs: Arc<S>,
    detached: bool,
}

impl<S: FileSystem + ?Sized> SiblingFileStore<S> {
    /// Store records beside the entries of `fs` itself
    pub fn new(fs: Arc<S>) -> Self {
        Self {
            fs,
            detached: false,
        }
    }

    /// Store records in a filesystem of their own
    pub fn detached(fs: Arc<S>) -> Self {
        Self { fs, detached: true }
    }

    pub fn file_system(&self) -> &S {
        &self.fs
    }

    /// Path of the sibling file holding a record
    pub fn marker_path(key: &MarkerKey) -> String {
        format!("{}{}", key.path, key.kind.suffix())
    }

    /// Create the parent directories of `path` in a detached store
    fn ensure_parents(&self, path: &str) -> VfsResult<()> {
        let Some(parent) = paths::parent(path) else {
            return Ok(());
        };
        let mut current = String::from(paths::ROOT);
        for component in parent.split('/').filter(|c| !c.is_empty()) {
            current = paths::join(&current, component);
            match self.fs.create_directory(&current) {
                Ok(()) | Err(VfsError::DestinationAlreadyExists(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn collect_markers(&self, directory: &str, suffix: &str, found: &mut Vec<String>) -> VfsResult<()> {
        let entries = match self.fs.list_directory(directory) {
            Ok(entries) => entries,
            Err(VfsError::PathNotFound(_)) | Err(VfsError::NotADirectory(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        for entity in &entries {
            match entity {
                Entity::Directory { .. } => self.collect_markers(entity.path(), suffix, found)?,
                _ => {
                    if let Some(path) = entity.path().strip_suffix(suffix) {
                        found.push(path.to_string());
                    }
                }
            }
        }
        Ok(())
    }
}

impl<S: FileSystem + ?Sized> MetadataStore for SiblingFileStore<S> {
    fn load(&self, key: &MarkerKey) -> VfsResult<Option<Vec<u8>>> {
        match utils::read_whole(&*self.fs, &Self::marker_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(VfsError::PathNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, key: &MarkerKey, content: &[u8]) -> VfsResult<()> {
        let marker = Self::marker_path(key);
        match utils::write_whole(&*self.fs, &marker, content) {
            Err(VfsError::PathNotFound(_)) if self.detached => {
                self.ensure_parents(&marker)?;
                utils::write_whole(&*self.fs, &marker, content)
            }
            other => other,
        }
    }

    fn remove(&self, key: &MarkerKey) -> VfsResult<bool> {
        match self.fs.delete_file(&Self::marker_path(key)) {
            Ok(()) => Ok(true),
            Err(VfsError::PathNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn contains(&self, key: &MarkerKey) -> bool {
        self.fs.path_exists(&Self::marker_path(key))
    }

    fn rename(&self, from: &MarkerKey, to: &MarkerKey) -> VfsResult<bool> {
        let source = Self::marker_path(from);
        let destination = Self::marker_path(to);
        if !self.fs.path_exists(&source) {
            return Ok(false);
        }
        if self.fs.path_exists(&destination) {
            self.fs.delete_file(&destination)?;
        }
        match self.fs.rename(&source, &destination) {
            Ok(()) => Ok(true),
            Err(VfsError::PathNotFound(_)) if self.detached => {
                self.ensure_parents(&destination)?;
                self.fs.rename(&source, &destination).map(|()| true)
            }
            Err(e) => Err(e),
        }
    }

    fn remove_tree(&self, path: &str) -> VfsResult<()> {
        if !self.detached {
            return Ok(());
        }
        match self.fs.delete_directory_recursively(path) {
            Ok(()) | Err(VfsError::PathNotFound(_)) | Err(VfsError::NotADirectory(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn rename_tree(&self, from: &str, to: &str) -> VfsResult<()> {
        if !self.detached {
            return Ok(());
        }
        match self.fs.rename(from, to) {
            Ok(()) | Err(VfsError::PathNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn paths_with(&self, directory: &str, kind: &MarkerKind) -> VfsResult<Vec<String>> {
        let mut found = Vec::new();
        self.collect_markers(directory, &kind.suffix(), &mut found)?;
        Ok(found)
    }
}

/// Volatile store in a concurrent map
#[derive(Default)]
pub struct InMemoryStore {
    records: DashMap<MarkerKey, Vec<u8>, RandomState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn keys_within(&self, path: &str) -> Vec<MarkerKey> {
        self.records
            .iter()
            .filter(|entry| paths::is_within(&entry.key().path, path))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl MetadataStore for InMemoryStore {
    fn load(&self, key: &MarkerKey) -> VfsResult<Option<Vec<u8>>> {
        Ok(self.records.get(key).map(|entry| entry.value().clone()))
    }

    fn store(&self, key: &MarkerKey, content: &[u8]) -> VfsResult<()> {
        self.records.insert(key.clone(), content.to_vec());
        Ok(())
    }

    fn remove(&self, key: &MarkerKey) -> VfsResult<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn contains(&self, key: &MarkerKey) -> bool {
        self.records.contains_key(key)
    }

    fn rename(&self, from: &MarkerKey, to: &MarkerKey) -> VfsResult<bool> {
        match self.records.remove(from) {
            Some((_, content)) => {
                self.records.insert(to.clone(), content);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove_tree(&self, path: &str) -> VfsResult<()> {
        for key in self.keys_within(path) {
            self.records.remove(&key);
        }
        Ok(())
    }

    fn rename_tree(&self, from: &str, to: &str) -> VfsResult<()> {
        for key in self.keys_within(from) {
            if let Some((_, content)) = self.records.remove(&key) {
                let rebased = format!("{}{}", to, &key.path[from.len()..]);
                self.records.insert(key.moved_to(rebased), content);
            }
        }
        Ok(())
    }

    fn paths_with(&self, directory: &str, kind: &MarkerKind) -> VfsResult<Vec<String>> {
        Ok(self
            .keys_within(directory)
            .into_iter()
            .filter(|key| key.kind == *kind)
            .map(|key| key.path)
            .collect())
    }
}
