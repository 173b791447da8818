use crate::core::log::QueryLog;
use crate::core::record::{RawQueryRecord, RawTime, StackFrame};
use crate::instrumentation::traceback::{capture_stack, TracebackFilter};

use std::future::Future;
use std::time::{Duration, Instant};

/// Whether executed queries carry the call stack that issued them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StackCapture {
    #[default]
    Disabled,
    Enabled(TracebackFilter),
}

impl StackCapture {
    pub fn capture(&self) -> Option<Vec<StackFrame>> {
        match self {
            StackCapture::Disabled => None,
            StackCapture::Enabled(filter) => Some(capture_stack(filter)),
        }
    }
}

/// Wraps query execution and appends a record of each statement to a [`QueryLog`].
///
/// Build one at startup and route every database call through it.
#[derive(Clone, Default)]
pub struct QueryRecorder {
    log: QueryLog,
    capture: StackCapture,
}

impl QueryRecorder {
    pub fn new(log: QueryLog, capture: StackCapture) -> Self {
        Self { log, capture }
    }

    pub fn log(&self) -> &QueryLog {
        &self.log
    }

    /// Runs `f`, timing it. The record is written whatever `f` returns.
    pub fn execute<T>(&self, sql: &str, f: impl FnOnce() -> T) -> T {
        let guard = Pending::start(self, sql);
        let out = f();
        drop(guard);
        out
    }

    pub async fn execute_async<F: Future>(&self, sql: &str, fut: F) -> F::Output {
        let guard = Pending::start(self, sql);
        let out = fut.await;
        drop(guard);
        out
    }

    /// Appends a statement timed elsewhere.
    pub fn record(&self, sql: &str, elapsed: Duration) {
        self.log.push(RawQueryRecord {
            sql: Some(sql.to_string()),
            time: RawTime::Seconds(elapsed.as_secs_f64()),
            tb: self.capture.capture(),
        });
    }
}

// Writes the record on drop, so panics inside the wrapped call are logged too.
struct Pending<'a> {
    recorder: &'a QueryRecorder,
    sql: &'a str,
    started: Instant,
}

impl<'a> Pending<'a> {
    fn start(recorder: &'a QueryRecorder, sql: &'a str) -> Self {
        Self { recorder, sql, started: Instant::now() }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        self.recorder.record(self.sql, self.started.elapsed());
    }
}
