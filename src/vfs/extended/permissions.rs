/*!
 * Permission Emulation
 * Unix permissions and Windows attributes kept in one four-line record
 */

use tracing::debug;

use super::super::traits::FileSystem;
use super::super::types::*;
use super::store::{load_lines, store_lines, MarkerKey, MarkerKind};
use super::ExtendedSupportFs;

/// Contents of a permissions marker
///
/// Lines: octal mode, uid, gid, Windows attribute bits. Empty lines mean the
/// value was never set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct PermissionRecord {
    pub unix: Option<UnixPermissions>,
    pub windows: Option<WindowsAttributes>,
}

impl PermissionRecord {
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        let field = |index: usize| lines.get(index).map(|line| line.as_ref().trim()).unwrap_or("");

        let unix = match (
            u32::from_str_radix(field(0), 8),
            field(1).parse::<u32>(),
            field(2).parse::<u32>(),
        ) {
            (Ok(mode), Ok(uid), Ok(gid)) => Some(UnixPermissions::new(mode, uid, gid)),
            _ => None,
        };
        let windows = field(3).parse::<u32>().ok().map(WindowsAttributes::from_bits);
        Self { unix, windows }
    }

    pub fn lines(&self) -> [String; 4] {
        let (mode, uid, gid) = match self.unix {
            Some(perms) => (
                format!("{:o}", perms.mode),
                perms.uid.to_string(),
                perms.gid.to_string(),
            ),
            None => Default::default(),
        };
        let windows = self
            .windows
            .map(|attributes| attributes.to_bits().to_string())
            .unwrap_or_default();
        [mode, uid, gid, windows]
    }
}

impl<F: FileSystem> ExtendedSupportFs<F> {
    fn load_record(&self, path: &str) -> VfsResult<Option<PermissionRecord>> {
        let key = MarkerKey::new(path, MarkerKind::Permissions);
        Ok(load_lines(&*self.store, &key)?.map(|lines| PermissionRecord::parse(&lines)))
    }

    /// Read-modify-write of a path's permission record
    fn update_record(&self, path: &str, update: impl FnOnce(&mut PermissionRecord)) -> VfsResult<()> {
        let _guard = self.marker_locks.lock(path);
        let mut record = match self.load_record(path)? {
            Some(record) => record,
            None if self.inner.path_exists(path) => PermissionRecord::default(),
            None => return Err(VfsError::PathNotFound(path.to_string())),
        };
        update(&mut record);
        store_lines(
            &*self.store,
            &MarkerKey::new(path, MarkerKind::Permissions),
            &record.lines(),
        )
    }

    pub(super) fn emulated_unix_permissions(&self, path: &str) -> VfsResult<UnixPermissions> {
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);
        if self.emulates(self.config.symbolic_links) && self.symlink_target(&path)?.is_some() {
            return Ok(UnixPermissions::default_directory());
        }
        match self.load_record(&path)?.and_then(|record| record.unix) {
            Some(perms) => Ok(perms),
            None => self.inner.get_unix_permissions(&path),
        }
    }

    pub(super) fn emulated_set_unix_permissions(&self, path: &str, permissions: UnixPermissions) -> VfsResult<()> {
        let path = self.canonical(path)?;
        self.update_record(&path, |record| record.unix = Some(permissions))?;
        debug!(path = %path, mode = %permissions, "stored unix permissions");
        Ok(())
    }

    pub(super) fn emulated_windows_attributes(&self, path: &str) -> VfsResult<WindowsAttributes> {
        let path = self.canonical(path)?;
        let _guard = self.marker_locks.lock(&path);
        match self.load_record(&path)?.and_then(|record| record.windows) {
            Some(attributes) => Ok(attributes),
            None => self.inner.get_windows_attributes(&path),
        }
    }

    pub(super) fn emulated_set_windows_attributes(&self, path: &str, attributes: WindowsAttributes) -> VfsResult<()> {
        let path = self.canonical(path)?;
        self.update_record(&path, |record| record.windows = Some(attributes))?;
        debug!(path = %path, bits = attributes.to_bits(), "stored windows attributes");
        Ok(())
    }
}
