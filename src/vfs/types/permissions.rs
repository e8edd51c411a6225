/*!
 * VFS Permissions
 * Unix-style permission bits plus owning user and group
 */

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const OWNER_READ: u32 = 0o400;
pub const OWNER_WRITE: u32 = 0o200;
pub const OWNER_EXECUTE: u32 = 0o100;
pub const GROUP_READ: u32 = 0o040;
pub const GROUP_WRITE: u32 = 0o020;
pub const GROUP_EXECUTE: u32 = 0o010;
pub const OTHERS_READ: u32 = 0o004;
pub const OTHERS_WRITE: u32 = 0o002;
pub const OTHERS_EXECUTE: u32 = 0o001;
pub const SET_USER_ID: u32 = 0o4000;
pub const SET_GROUP_ID: u32 = 0o2000;
pub const STICKY: u32 = 0o1000;

/// Unix permissions with validation
///
/// # Performance
/// - Packed C layout, `Copy`, compared bitwise
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnixPermissions {
    #[serde(deserialize_with = "deserialize_permission_mode")]
    pub mode: u32,
    #[serde(default)]
    pub uid: u32,
    #[serde(default)]
    pub gid: u32,
}

impl UnixPermissions {
    /// Create permissions with mode validation (masks to valid bits)
    #[inline]
    #[must_use]
    pub const fn new(mode: u32, uid: u32, gid: u32) -> Self {
        Self {
            mode: mode & 0o7777,
            uid,
            gid,
        }
    }

    /// Build from a numeric mode, owned by root
    #[inline]
    #[must_use]
    pub const fn from_mode(mode: u32) -> Self {
        Self::new(mode, 0, 0)
    }

    /// Default set reported for files (0o666)
    #[inline]
    #[must_use]
    pub const fn default_file() -> Self {
        Self::from_mode(0o666)
    }

    /// Default set reported for directories (0o777)
    #[inline]
    #[must_use]
    pub const fn default_directory() -> Self {
        Self::from_mode(0o777)
    }

    /// Numeric mode, standard octal layout
    #[inline(always)]
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Check a single permission bit (one of the module constants)
    ///
    /// # Performance
    /// Hot path - called for every permission query through adapters
    #[inline(always)]
    #[must_use]
    pub const fn has(&self, bit: u32) -> bool {
        self.mode & bit != 0
    }

    /// Set or clear a single permission bit
    #[inline]
    pub fn set(&mut self, bit: u32, enabled: bool) {
        if enabled {
            self.mode |= bit & 0o7777;
        } else {
            self.mode &= !bit;
        }
    }

    /// Check if permissions are read-only (no write bits set)
    #[inline]
    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.mode & 0o222 == 0
    }

    /// Get user permissions (rwx)
    #[inline]
    #[must_use]
    pub const fn user_permissions(&self) -> u32 {
        (self.mode >> 6) & 0o7
    }

    /// Get group permissions (rwx)
    #[inline]
    #[must_use]
    pub const fn group_permissions(&self) -> u32 {
        (self.mode >> 3) & 0o7
    }

    /// Get other permissions (rwx)
    #[inline]
    #[must_use]
    pub const fn other_permissions(&self) -> u32 {
        self.mode & 0o7
    }
}

impl Default for UnixPermissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// `ls -l` style rendering, e.g. `rwxr-x---`, `rwsr-xr-t`
impl fmt::Display for UnixPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let triple = |r: u32, w: u32, x: u32, special: u32, set: char, unset: char| {
            let exec = match (self.has(x), self.has(special)) {
                (true, true) => set,
                (false, true) => unset,
                (true, false) => 'x',
                (false, false) => '-',
            };
            [
                if self.has(r) { 'r' } else { '-' },
                if self.has(w) { 'w' } else { '-' },
                exec,
            ]
        };

        let chars = [
            triple(OWNER_READ, OWNER_WRITE, OWNER_EXECUTE, SET_USER_ID, 's', 'S'),
            triple(GROUP_READ, GROUP_WRITE, GROUP_EXECUTE, SET_GROUP_ID, 's', 'S'),
            triple(OTHERS_READ, OTHERS_WRITE, OTHERS_EXECUTE, STICKY, 't', 'T'),
        ];
        for c in chars.iter().flatten() {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Deserialize and validate permission mode (must be <= 0o7777)
fn deserialize_permission_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let mode = u32::deserialize(deserializer)?;
    if mode > 0o7777 {
        return Err(serde::de::Error::custom(format!(
            "invalid permission mode: 0o{:o} exceeds maximum 0o7777",
            mode
        )));
    }
    Ok(mode)
}
