/*!
 * Lock Striping Pattern
 * Serializes read-modify-write sequences per key without a lock per key
 */

use parking_lot::{Mutex, MutexGuard};
use std::hash::Hash;

/// Striped mutex set keyed by any hashable value
///
/// Memory stays fixed no matter how many paths are ever locked. Keys that
/// share a stripe serialize against each other. Callers hold at most one
/// stripe guard at a time.
pub struct StripedLocks {
    stripes: Vec<Mutex<()>>,
    stripe_mask: usize,
    hasher: ahash::RandomState,
}

impl StripedLocks {
    /// Create new striped lock set
    ///
    /// `stripe_count` must be a power of 2
    pub fn new(stripe_count: usize) -> Self {
        assert!(
            stripe_count > 0 && stripe_count.is_power_of_two(),
            "Stripe count must be a power of 2"
        );

        let mut stripes = Vec::with_capacity(stripe_count);
        for _ in 0..stripe_count {
            stripes.push(Mutex::new(()));
        }

        Self {
            stripes,
            stripe_mask: stripe_count - 1,
            hasher: ahash::RandomState::new(),
        }
    }

    /// Get stripe index for key (uses hash)
    #[inline]
    fn stripe_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) & self.stripe_mask
    }

    /// Lock the stripe owning `key`
    pub fn lock<K: Hash + ?Sized>(&self, key: &K) -> MutexGuard<'_, ()> {
        let idx = self.stripe_index(key);
        self.stripes[idx].lock()
    }

    /// Number of stripes
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}

impl Default for StripedLocks {
    fn default() -> Self {
        Self::new(16)
    }
}
