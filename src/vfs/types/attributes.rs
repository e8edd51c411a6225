/*!
 * Windows Attributes
 * DOS/Windows file attribute flags with FILE_ATTRIBUTE_* numeric encoding
 */

use serde::{Deserialize, Serialize};

pub const FILE_ATTRIBUTE_READONLY: u32 = 0x1;
pub const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
pub const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x20;
pub const FILE_ATTRIBUTE_TEMPORARY: u32 = 0x100;
pub const FILE_ATTRIBUTE_COMPRESSED: u32 = 0x800;
pub const FILE_ATTRIBUTE_OFFLINE: u32 = 0x1000;
pub const FILE_ATTRIBUTE_NOT_CONTENT_INDEXED: u32 = 0x2000;
pub const FILE_ATTRIBUTE_ENCRYPTED: u32 = 0x4000;

/// Windows-style attribute flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsAttributes {
    pub archive: bool,
    pub compressed: bool,
    pub encrypted: bool,
    pub hidden: bool,
    pub not_content_indexed: bool,
    pub offline: bool,
    pub read_only: bool,
    pub temporary: bool,
}

impl WindowsAttributes {
    /// Only the read-only flag set
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            archive: false,
            compressed: false,
            encrypted: false,
            hidden: false,
            not_content_indexed: false,
            offline: false,
            read_only: true,
            temporary: false,
        }
    }

    /// Decode from FILE_ATTRIBUTE_* bits; unknown bits are ignored
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            archive: bits & FILE_ATTRIBUTE_ARCHIVE != 0,
            compressed: bits & FILE_ATTRIBUTE_COMPRESSED != 0,
            encrypted: bits & FILE_ATTRIBUTE_ENCRYPTED != 0,
            hidden: bits & FILE_ATTRIBUTE_HIDDEN != 0,
            not_content_indexed: bits & FILE_ATTRIBUTE_NOT_CONTENT_INDEXED != 0,
            offline: bits & FILE_ATTRIBUTE_OFFLINE != 0,
            read_only: bits & FILE_ATTRIBUTE_READONLY != 0,
            temporary: bits & FILE_ATTRIBUTE_TEMPORARY != 0,
        }
    }

    /// Encode as FILE_ATTRIBUTE_* bits
    #[must_use]
    pub const fn to_bits(&self) -> u32 {
        let mut bits = 0;
        if self.archive {
            bits |= FILE_ATTRIBUTE_ARCHIVE;
        }
        if self.compressed {
            bits |= FILE_ATTRIBUTE_COMPRESSED;
        }
        if self.encrypted {
            bits |= FILE_ATTRIBUTE_ENCRYPTED;
        }
        if self.hidden {
            bits |= FILE_ATTRIBUTE_HIDDEN;
        }
        if self.not_content_indexed {
            bits |= FILE_ATTRIBUTE_NOT_CONTENT_INDEXED;
        }
        if self.offline {
            bits |= FILE_ATTRIBUTE_OFFLINE;
        }
        if self.read_only {
            bits |= FILE_ATTRIBUTE_READONLY;
        }
        if self.temporary {
            bits |= FILE_ATTRIBUTE_TEMPORARY;
        }
        bits
    }
}
