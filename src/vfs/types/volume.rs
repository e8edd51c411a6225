/*!
 * Volume Information
 * Point-in-time snapshot of every volume-level query
 */

use serde::{Deserialize, Serialize};

/// Volume snapshot as reported to host adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VolumeInfo {
    pub volume_name: String,
    pub file_system_name: String,
    pub case_sensitive: bool,
    pub block_size: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub available_blocks: u64,
    pub max_path_length: u32,
    pub files_free_count: u64,
    pub total_files_count: u64,
    pub read_only: bool,
    pub unicode_filenames: bool,
    pub compressed: bool,
    pub serial_number: u32,
}

impl VolumeInfo {
    /// Total bytes (blocks × block size)
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.total_blocks.saturating_mul(self.block_size)
    }

    /// Free bytes (blocks × block size)
    #[must_use]
    pub fn free_bytes(&self) -> u64 {
        self.free_blocks.saturating_mul(self.block_size)
    }
}
