/*!
 * System Limits and Constants
 *
 * Centralized location for filesystem-wide limits, defaults and reserved names.
 * Organized by layer for discoverability.
 *
 * - Performance-relevant constants are marked with [PERF]
 * - Values reported to host drivers are marked with [HOST]
 */

// =============================================================================
// CHUNKED STREAM
// =============================================================================

/// Default chunk size for in-memory file content (16KB)
/// [PERF] Four 4KB pages; large enough that sequential writes rarely allocate
pub const DEFAULT_CHUNK_SIZE: usize = 4096 * 4;

// =============================================================================
// MEMORY FILESYSTEM
// =============================================================================

/// Capacity reported by an unbounded memory volume (4GB)
/// [HOST] Drivers insist on a finite total/free block count
pub const VIRTUAL_MEMORY_CAPACITY: u64 = 4 * 1024 * 1024 * 1024;

/// Volume name of the memory filesystem
pub const MEMORY_VOLUME_NAME: &str = "RAM-Disk";

/// Filesystem name of the memory filesystem
pub const MEMORY_FILESYSTEM_NAME: &str = "Memory Fs";

// =============================================================================
// CAPABILITY CONTRACT DEFAULTS
// =============================================================================

/// Maximum path length
/// [HOST] Matches the Windows extended-length path limit
pub const DEFAULT_MAX_PATH_LENGTH: u32 = 32768;

/// Number of files that may still be created
/// [HOST]
pub const DEFAULT_FILES_FREE_COUNT: u64 = 256_000;

/// Volume serial number
/// [HOST]
pub const DEFAULT_VOLUME_SERIAL: u32 = 42;

// =============================================================================
// EXTENDED SUPPORT MARKERS
// =============================================================================

/// Reserved prefix of every hidden marker entry
/// Paths containing it are invisible through the extended-support layer
pub const MARKER_PREFIX: &str = "EXTENDED_$$";

/// Suffix of the Unix permission / Windows attribute marker
pub const PERMISSIONS_MARKER: &str = "EXTENDED_$$PERMISSIONS";

/// Suffix of the extended attribute index marker
/// Attribute contents live under `<path>EXTENDED_$$ATTRIBUTES_<name>`
pub const ATTRIBUTES_MARKER: &str = "EXTENDED_$$ATTRIBUTES";

/// Suffix of the symbolic link marker
pub const SYMLINK_MARKER: &str = "EXTENDED_$$SYMLINK";

/// Suffix of the hard link group marker
pub const HARDLINK_MARKER: &str = "EXTENDED_$$HARDLINK";

// =============================================================================
// SYNCHRONIZATION
// =============================================================================

/// Stripe count for per-path marker locks
/// [PERF] Power of two; 64 stripes keeps unrelated paths from contending
pub const MARKER_LOCK_STRIPES: usize = 64;
