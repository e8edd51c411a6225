/*!
 * File Handle
 * Opaque open-file token shared between a caller and one filesystem layer
 */

use super::errors::{VfsError, VfsResult};
use crate::core::id::{next_handle_id, HandleId};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Open file handle
///
/// Binds a path to an implementation-specific backing object plus the
/// read/write intent given at open time. Clones are cheap and share the
/// closed flag and the backing, so any clone may be used for I/O and a close
/// through one clone is observed by all.
///
/// Layers identify handles by [`HandleId`], never by address.
#[derive(Clone)]
pub struct FileHandle {
    id: HandleId,
    path: String,
    read: bool,
    write: bool,
    closed: Arc<AtomicBool>,
    backing: Arc<dyn Any + Send + Sync>,
}

impl FileHandle {
    /// Create a handle with a fresh process-unique id
    pub fn new<B>(path: impl Into<String>, read: bool, write: bool, backing: B) -> Self
    where
        B: Any + Send + Sync,
    {
        Self {
            id: next_handle_id(),
            path: path.into(),
            read,
            write,
            closed: Arc::new(AtomicBool::new(false)),
            backing: Arc::new(backing),
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn id(&self) -> HandleId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline(always)]
    #[must_use]
    pub fn can_read(&self) -> bool {
        self.read
    }

    #[inline(always)]
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.write
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Fail with AccessDenied if the handle was closed
    #[inline]
    pub fn ensure_open(&self) -> VfsResult<()> {
        if self.is_closed() {
            return Err(VfsError::AccessDenied(format!(
                "handle {} for {} is closed",
                self.id, self.path
            )));
        }
        Ok(())
    }

    /// Mark closed; AccessDenied if it already was
    pub fn mark_closed(&self) -> VfsResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(VfsError::AccessDenied(format!(
                "handle {} for {} already closed",
                self.id, self.path
            )));
        }
        Ok(())
    }

    /// Downcast the backing object
    ///
    /// Returns `None` when the handle was produced by a different layer.
    #[inline]
    #[must_use]
    pub fn backing<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.backing.downcast_ref::<T>()
    }

    /// Downcast the backing or fail with AccessDenied
    pub fn backing_or_denied<T: Any + Send + Sync>(&self) -> VfsResult<&T> {
        self.backing::<T>().ok_or_else(|| {
            VfsError::AccessDenied(format!(
                "handle {} for {} was not opened by this filesystem",
                self.id, self.path
            ))
        })
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("read", &self.read)
            .field("write", &self.write)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
