//! Inspection around an arbitrary unit of work, outside any request.
//!
//! Same analysis as the middleware; there is no response, so no headers.
//! The work runs with its own request log scoped to the current task.

use crate::core::log::QueryLog;
use crate::core::pipeline::{Analysis, Inspector};
use crate::core::stats::RequestContext;
use crate::core::task_ctx;
use crate::observability::prom;

use std::future::Future;

/// Runs `f` and reports the queries it issued.
pub fn inspect_queries<T>(inspector: &Inspector, f: impl FnOnce() -> T) -> T {
    run_inspection(inspector, f).0
}

/// Like [`inspect_queries`], but an `Err` from `f` skips reporting.
pub fn try_inspect_queries<T, E>(inspector: &Inspector, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    try_run_inspection(inspector, f).0
}

pub async fn inspect_queries_async<F: Future>(inspector: &Inspector, fut: F) -> F::Output {
    if !inspector.enabled() {
        return fut.await;
    }
    let log = QueryLog::new();
    let ctx = RequestContext::begin(&log);
    let out = task_ctx::scope(log.clone(), fut).await;
    conclude(inspector, &log, ctx);
    out
}

/// Runs `f` and hands back the analysis alongside its result.
///
/// The analysis is `None` when inspection is disabled or failed. A panic in
/// `f` unwinds through without reporting.
pub fn run_inspection<T>(inspector: &Inspector, f: impl FnOnce() -> T) -> (T, Option<Analysis>) {
    if !inspector.enabled() {
        return (f(), None);
    }
    let log = QueryLog::new();
    let ctx = RequestContext::begin(&log);
    let out = task_ctx::sync_scope(log.clone(), f);
    (out, conclude(inspector, &log, ctx))
}

/// [`run_inspection`] for fallible work: nothing is analysed when `f` fails.
pub fn try_run_inspection<T, E>(
    inspector: &Inspector,
    f: impl FnOnce() -> Result<T, E>,
) -> (Result<T, E>, Option<Analysis>) {
    if !inspector.enabled() {
        return (f(), None);
    }
    let log = QueryLog::new();
    let ctx = RequestContext::begin(&log);
    match task_ctx::sync_scope(log.clone(), f) {
        Ok(out) => (Ok(out), conclude(inspector, &log, ctx)),
        Err(e) => (Err(e), None),
    }
}

fn conclude(inspector: &Inspector, log: &QueryLog, ctx: RequestContext) -> Option<Analysis> {
    let (records, elapsed) = ctx.finish(log);
    match inspector.analyze(&records, elapsed) {
        Ok(analysis) => {
            analysis.report.emit();
            prom::observe_analysis(&analysis);
            Some(analysis)
        }
        Err(e) => {
            tracing::error!(target: "query_inspect", "query inspection failed: {}", e);
            None
        }
    }
}
