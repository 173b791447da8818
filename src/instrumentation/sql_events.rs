#![cfg(feature = "sqlx")]

use crate::core::log::QueryLog;
use crate::core::record::{RawQueryRecord, RawTime};
use crate::instrumentation::recorder::StackCapture;

use std::fmt;

use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, Layer};

/// Pulls statement text and timing out of a `sqlx::query` event.
#[derive(Default)]
struct SqlVisitor {
    statement: Option<String>,
    summary: Option<String>,
    elapsed_secs: Option<f64>,
    elapsed: Option<String>,
}

impl tracing::field::Visit for SqlVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if field.name() == "elapsed_secs" {
            self.elapsed_secs = Some(value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "db.statement" | "statement" => self.statement = Some(value.trim().to_string()),
            "summary" | "message" => self.summary = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        match field.name() {
            "elapsed" => self.elapsed = Some(format!("{value:?}")),
            "summary" | "message" if self.summary.is_none() => self.summary = Some(format!("{value:?}")),
            _ => {}
        }
    }
}

impl SqlVisitor {
    fn into_record(self) -> RawQueryRecord {
        // short statements travel in `summary` with an empty `db.statement`
        let sql = self.statement.filter(|s| !s.is_empty()).or(self.summary);
        let time = match (self.elapsed_secs, self.elapsed) {
            (Some(secs), _) => RawTime::Seconds(secs),
            (None, Some(text)) => RawTime::Text(text),
            (None, None) => RawTime::Text(String::new()),
        };
        RawQueryRecord { sql, time, tb: None }
    }
}

/// Feeds sqlx's query log events into a [`QueryLog`].
///
/// Events fire on the task that ran the statement, so the captured stack is
/// the caller's.
pub struct SqlxQueryLog {
    log: QueryLog,
    capture: StackCapture,
}

impl SqlxQueryLog {
    pub fn new(log: QueryLog, capture: StackCapture) -> Self {
        Self { log, capture }
    }
}

impl<S> Layer<S> for SqlxQueryLog
where
    S: Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("sqlx::query") {
            return;
        }

        let mut vis = SqlVisitor::default();
        event.record(&mut vis);

        let mut record = vis.into_record();
        record.tb = self.capture.capture();
        self.log.push(record);
    }
}
