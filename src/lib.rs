//! tracekit - in-process core of the tracing SDK
//!
//! Resolves and caches the trace collector daemon endpoint, and wraps
//! outbound database calls in trace subsegments.

pub mod config;
pub mod endpoint;
pub mod errors; // Structured error handling
pub mod recorder;
pub mod sql;

pub use endpoint::{EndpointCache, Resolve, SystemResolver};
pub use errors::{TraceError, TraceResult};
pub use recorder::{NoopRecorder, TraceRecorder};
pub use sql::{SqlCommand, SqlInterceptor};
