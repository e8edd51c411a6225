/*!
 * ID Generation
 * Handle identifiers and the counters that mint them
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Open file handle identifier
///
/// Unique for the lifetime of the process. Caches, lock tables and handle
/// routing tables are keyed by this value instead of handle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Monotonic counter, cache-line aligned so neighbouring counters do not
/// share a line
#[repr(C, align(64))]
#[derive(Debug)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub const fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }

    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Value the next call to [`next`](Self::next) returns
    #[inline]
    pub fn peek(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

static HANDLE_IDS: IdGenerator = IdGenerator::starting_at(1);

/// Allocate a process-wide unique handle id
///
/// Shared by every filesystem layer so that ids never collide when a
/// decorator mixes handles from two inner filesystems.
#[inline]
pub fn next_handle_id() -> HandleId {
    HandleId(HANDLE_IDS.next())
}
