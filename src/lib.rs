pub mod config;
pub mod core;
pub mod error;
pub mod instrumentation;
pub mod observability;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{global, init_global, initiate, QueryInspectConfig};
pub use crate::core::{Analysis, Inspector, QueryLog, RawQueryRecord, RequestContext, RequestStats};
pub use error::{ConfigError, InspectError};
pub use instrumentation::{QueryRecorder, StackCapture, TracebackFilter};
pub use services::{inspect_queries, inspect_queries_async, try_inspect_queries, QueryInspect};

// Prometheus metrics
pub use observability::prom::metrics_handler;
