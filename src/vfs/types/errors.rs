/*!
 * VFS Error Types
 * Portable error taxonomy shared by every filesystem layer
 */

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// VFS operation result
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS errors
///
/// Exactly one variant per error kind. String payloads name the path,
/// feature or attribute involved and are meant for diagnostics only:
/// callers match on [`VfsError::kind`], never on messages.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum VfsError {
    #[error("Path not found: {0}")]
    PathNotFound(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Access denied: {0}")]
    AccessDenied(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Not a file: {0}")]
    NotAFile(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Not a directory: {0}")]
    NotADirectory(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Destination already exists: {0}")]
    DestinationAlreadyExists(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Source already exists: {0}")]
    SourceAlreadyExists(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Drive full")]
    DriveFull,

    #[error("Part of the file is locked")]
    PartIsLocked,

    #[error("Range already locked")]
    AlreadyLocked,

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("No capacity left for new entries")]
    NoCapacity,
}

/// Fieldless error kind for matching without caring about payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PathNotFound,
    AccessDenied,
    NotAFile,
    NotADirectory,
    DestinationAlreadyExists,
    SourceAlreadyExists,
    DriveFull,
    PartIsLocked,
    AlreadyLocked,
    UnsupportedFeature,
    AttributeNotFound,
    NoCapacity,
}

impl VfsError {
    /// Kind of this error
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PathNotFound(_) => ErrorKind::PathNotFound,
            Self::AccessDenied(_) => ErrorKind::AccessDenied,
            Self::NotAFile(_) => ErrorKind::NotAFile,
            Self::NotADirectory(_) => ErrorKind::NotADirectory,
            Self::DestinationAlreadyExists(_) => ErrorKind::DestinationAlreadyExists,
            Self::SourceAlreadyExists(_) => ErrorKind::SourceAlreadyExists,
            Self::DriveFull => ErrorKind::DriveFull,
            Self::PartIsLocked => ErrorKind::PartIsLocked,
            Self::AlreadyLocked => ErrorKind::AlreadyLocked,
            Self::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Self::AttributeNotFound(_) => ErrorKind::AttributeNotFound,
            Self::NoCapacity => ErrorKind::NoCapacity,
        }
    }

    /// True for errors a layer may answer with its own fallback
    /// (path missing on this side, or feature not implemented here)
    #[inline]
    #[must_use]
    pub const fn is_fallthrough(&self) -> bool {
        matches!(self, Self::PathNotFound(_) | Self::UnsupportedFeature(_))
    }

    pub(crate) fn unsupported(feature: &str) -> Self {
        Self::UnsupportedFeature(feature.to_string())
    }
}

/// Deserialize and validate non-empty string for error messages
pub(super) fn deserialize_nonempty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::custom("error message must not be empty"));
    }
    Ok(s)
}
