/*!
 * Monitoring
 * Structured logging for filesystem layers
 */

mod tracer;

pub use tracer::{init_tracing, operation_span};
