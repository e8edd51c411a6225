/*!
 * Extended Attribute Emulation
 * Name index plus one content record per attribute
 */

use tracing::debug;

use super::super::traits::FileSystem;
use super::super::types::*;
use super::store::{load_lines, store_lines, MarkerKey, MarkerKind};
use super::ExtendedSupportFs;

/// Names are stored one per line and appended to marker file names
fn validate_name(name: &str) -> VfsResult<()> {
    if name.is_empty() || name.contains(['\n', '\r', '/']) {
        return Err(VfsError::AccessDenied(format!(
            "invalid extended attribute name {:?}",
            name
        )));
    }
    Ok(())
}

impl<F: FileSystem> ExtendedSupportFs<F> {
    /// Attribute names of a path; PathNotFound only if the path is missing
    pub(super) fn attribute_names(&self, path: &str) -> VfsResult<Vec<String>> {
        match load_lines(&*self.store, &MarkerKey::new(path, MarkerKind::AttributeIndex))? {
            Some(names) => Ok(names.into_iter().filter(|name| !name.is_empty()).collect()),
            None if self.inner.path_exists(path) => Ok(Vec::new()),
            None => Err(VfsError::PathNotFound(path.to_string())),
        }
    }

    fn attribute_content(&self, path: &str, name: &str) -> VfsResult<Vec<u8>> {
        let key = MarkerKey::new(path, MarkerKind::Attribute(name.to_string()));
        Ok(self.store.load(&key)?.unwrap_or_default())
    }

    pub(super) fn emulated_list_attributes(&self, path: &str) -> VfsResult<Vec<ExtendedAttribute>> {
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);
        self.attribute_names(&path)?
            .into_iter()
            .map(|name| {
                let content = self.attribute_content(&path, &name)?;
                Ok(ExtendedAttribute::new(name, content))
            })
            .collect()
    }

    pub(super) fn emulated_get_attribute(&self, path: &str, name: &str) -> VfsResult<ExtendedAttribute> {
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);
        if !self.attribute_names(&path)?.iter().any(|n| n == name) {
            return Err(VfsError::AttributeNotFound(name.to_string()));
        }
        Ok(ExtendedAttribute::new(name, self.attribute_content(&path, name)?))
    }

    pub(super) fn emulated_set_attribute(&self, path: &str, attribute: ExtendedAttribute) -> VfsResult<()> {
        validate_name(&attribute.name)?;
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);

        let mut names = self.attribute_names(&path)?;
        if !names.contains(&attribute.name) {
            names.push(attribute.name.clone());
            store_lines(&*self.store, &MarkerKey::new(&path, MarkerKind::AttributeIndex), &names)?;
        }
        let key = MarkerKey::new(&path, MarkerKind::Attribute(attribute.name.clone()));
        self.store.store(&key, &attribute.content)?;

        debug!(path = %path, name = %attribute.name, len = attribute.content.len(), "stored extended attribute");
        Ok(())
    }

    pub(super) fn emulated_remove_attribute(&self, path: &str, name: &str) -> VfsResult<()> {
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);

        let mut names = self.attribute_names(&path)?;
        let Some(index) = names.iter().position(|n| n == name) else {
            return Err(VfsError::AttributeNotFound(name.to_string()));
        };
        names.remove(index);

        self.store
            .remove(&MarkerKey::new(&path, MarkerKind::Attribute(name.to_string())))?;
        let index_key = MarkerKey::new(&path, MarkerKind::AttributeIndex);
        if names.is_empty() {
            self.store.remove(&index_key)?;
        } else {
            store_lines(&*self.store, &index_key, &names)?;
        }

        debug!(path = %path, name, "removed extended attribute");
        Ok(())
    }

    /// Move a path's index and every attribute record to another path
    pub(super) fn move_attributes(&self, from: &str, to: &str) {
        let names = match load_lines(&*self.store, &MarkerKey::new(from, MarkerKind::AttributeIndex)) {
            Ok(names) => names.unwrap_or_default(),
            Err(e) => {
                self.log_cleanup_failure(from, "attribute index", &e);
                return;
            }
        };
        for name in names.into_iter().filter(|name| !name.is_empty()) {
            let key = MarkerKey::new(from, MarkerKind::Attribute(name));
            let result = self.store.rename(&key, &key.moved_to(to));
            self.best_effort(from, "attribute", result);
        }
        let key = MarkerKey::new(from, MarkerKind::AttributeIndex);
        let result = self.store.rename(&key, &key.moved_to(to));
        self.best_effort(from, "attribute index", result);
    }

    /// Remove a path's index and every attribute record
    pub(super) fn remove_attributes(&self, path: &str) {
        let names = match load_lines(&*self.store, &MarkerKey::new(path, MarkerKind::AttributeIndex)) {
            Ok(names) => names.unwrap_or_default(),
            Err(e) => {
                self.log_cleanup_failure(path, "attribute index", &e);
                return;
            }
        };
        for name in names.into_iter().filter(|name| !name.is_empty()) {
            let result = self.store.remove(&MarkerKey::new(path, MarkerKind::Attribute(name)));
            self.best_effort(path, "attribute", result);
        }
        let result = self.store.remove(&MarkerKey::new(path, MarkerKind::AttributeIndex));
        self.best_effort(path, "attribute index", result);
    }
}
