/*!
 * Synchronization Primitives
 */

mod striped;

pub use striped::StripedLocks;
