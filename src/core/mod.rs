/*!
 * Core Module
 * Identifiers, limits and shared primitives
 */

pub mod id;
pub mod limits;
pub mod serde;
pub mod sync;
