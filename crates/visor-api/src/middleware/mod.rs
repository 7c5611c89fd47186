//! Request-level middleware: counters and request tracing.

pub mod metrics;
pub mod tracing_layer;
