/*!
 * Layer Configuration
 *
 * Plain, serde-loadable settings for the memory store and the decorators
 */

use serde::{Deserialize, Serialize};

use crate::core::limits::{DEFAULT_CHUNK_SIZE, MEMORY_VOLUME_NAME};

// =============================================================================
// MEMORY FILESYSTEM
// =============================================================================

/// In-memory filesystem configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MemFsConfig {
    /// Size of each content chunk, also reported as block size
    pub chunk_size: usize,
    /// Byte capacity; `None` reports a large virtual capacity and never fills
    pub capacity_bytes: Option<u64>,
    /// Maximum number of files and directories (root excluded)
    pub max_files: Option<u64>,
    pub volume_name: String,
    pub case_sensitive: bool,
}

impl Default for MemFsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            capacity_bytes: None,
            max_files: None,
            volume_name: MEMORY_VOLUME_NAME.to_string(),
            case_sensitive: true,
        }
    }
}

impl MemFsConfig {
    /// Bounded volume of `capacity_bytes`
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes: Some(capacity_bytes),
            ..Self::default()
        }
    }

    /// Small chunks, useful to exercise chunk boundaries
    pub fn small_chunks(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// CACHING DECORATOR
// =============================================================================

/// Caching decorator configuration
///
/// `None` inherits the inner filesystem's block size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub read_cache_size: Option<usize>,
    pub write_cache_size: Option<usize>,
}

impl CacheConfig {
    /// Same size for the read window and the write buffer
    pub const fn uniform(size: usize) -> Self {
        Self {
            read_cache_size: Some(size),
            write_cache_size: Some(size),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// EXTENDED-SUPPORT DECORATOR
// =============================================================================

/// How a feature is provided by the extended-support layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// Always use the side-store emulation
    #[default]
    Emulated,
    /// Pass straight to the inner filesystem
    Delegated,
    /// Call the inner filesystem, emulate on UnsupportedFeature
    PreferNative,
}

/// Per-feature support modes of the extended-support decorator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtendedConfig {
    pub symbolic_links: Support,
    pub hard_links: Support,
    pub unix_permissions: Support,
    pub windows_attributes: Support,
    pub extended_attributes: Support,
    pub file_locking: Support,
}

impl ExtendedConfig {
    /// Every feature in one mode
    pub const fn all(mode: Support) -> Self {
        Self {
            symbolic_links: mode,
            hard_links: mode,
            unix_permissions: mode,
            windows_attributes: mode,
            extended_attributes: mode,
            file_locking: mode,
        }
    }

    /// Use native support wherever the inner filesystem has it
    pub const fn prefer_native() -> Self {
        Self::all(Support::PreferNative)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
