pub mod recorder;
pub mod traceback;

#[cfg(feature = "sqlx")]
pub mod sql_events;

pub use recorder::{QueryRecorder, StackCapture};
pub use traceback::{capture_stack, TracebackFilter};
