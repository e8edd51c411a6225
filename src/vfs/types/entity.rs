/*!
 * VFS Entity
 * Value snapshots of files, directories and symbolic links
 */

use crate::core::serde::system_time_micros;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Entity kind without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    File,
    Directory,
    SymbolicLink,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityKind::File => write!(f, "file"),
            EntityKind::Directory => write!(f, "directory"),
            EntityKind::SymbolicLink => write!(f, "symbolic link"),
        }
    }
}

/// Creation, last-access and last-modification times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    #[serde(with = "system_time_micros")]
    pub created: SystemTime,
    #[serde(with = "system_time_micros")]
    pub accessed: SystemTime,
    #[serde(with = "system_time_micros")]
    pub modified: SystemTime,
}

impl Timestamps {
    /// All three times set to now
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self {
            created: now,
            accessed: now,
            modified: now,
        }
    }
}

/// Filesystem entity snapshot
///
/// Returned by metadata queries and listings. Not a live view: later
/// mutations of the filesystem are not reflected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    File {
        path: String,
        size: u64,
        times: Timestamps,
    },
    Directory {
        path: String,
        times: Timestamps,
    },
    SymbolicLink {
        path: String,
        destination: String,
        times: Timestamps,
    },
}

impl Entity {
    #[must_use]
    pub fn file(path: impl Into<String>, size: u64, times: Timestamps) -> Self {
        Self::File {
            path: path.into(),
            size,
            times,
        }
    }

    #[must_use]
    pub fn directory(path: impl Into<String>, times: Timestamps) -> Self {
        Self::Directory {
            path: path.into(),
            times,
        }
    }

    #[must_use]
    pub fn symbolic_link(
        path: impl Into<String>,
        destination: impl Into<String>,
        times: Timestamps,
    ) -> Self {
        Self::SymbolicLink {
            path: path.into(),
            destination: destination.into(),
            times,
        }
    }

    /// Full path of the entity
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::File { path, .. } | Self::Directory { path, .. } | Self::SymbolicLink { path, .. } => {
                path
            }
        }
    }

    /// Last path component (empty for the root)
    #[must_use]
    pub fn file_name(&self) -> &str {
        crate::vfs::paths::file_name(self.path())
    }

    /// Byte length for files, 0 otherwise
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::File { size, .. } => *size,
            Self::Directory { .. } | Self::SymbolicLink { .. } => 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn times(&self) -> &Timestamps {
        match self {
            Self::File { times, .. }
            | Self::Directory { times, .. }
            | Self::SymbolicLink { times, .. } => times,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::File { .. } => EntityKind::File,
            Self::Directory { .. } => EntityKind::Directory,
            Self::SymbolicLink { .. } => EntityKind::SymbolicLink,
        }
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_symbolic_link(&self) -> bool {
        matches!(self, Self::SymbolicLink { .. })
    }

    /// Same snapshot under another path
    ///
    /// Used when one path reports the metadata of another, e.g. a hard-link
    /// member reporting its canonical member's size and times.
    #[must_use]
    pub fn with_path(self, new_path: impl Into<String>) -> Self {
        let new_path = new_path.into();
        match self {
            Self::File { size, times, .. } => Self::File {
                path: new_path,
                size,
                times,
            },
            Self::Directory { times, .. } => Self::Directory {
                path: new_path,
                times,
            },
            Self::SymbolicLink {
                destination, times, ..
            } => Self::SymbolicLink {
                path: new_path,
                destination,
                times,
            },
        }
    }
}
