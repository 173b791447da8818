use crate::core::log::QueryLog;
use crate::core::normalize::NormalizedQuery;
use crate::core::record::RawQueryRecord;
use time::{Duration, OffsetDateTime};

/// Aggregate figures for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestStats {
    pub query_count: usize,
    pub duplicate_count: usize,
    /// Seconds.
    pub total_sql_time: f64,
    /// Seconds.
    pub total_request_time: f64,
}

impl RequestStats {
    pub fn new(queries: &[NormalizedQuery], duplicate_count: usize, total_request_time: f64) -> Self {
        Self {
            query_count: queries.len(),
            duplicate_count,
            total_sql_time: queries.iter().map(|q| q.elapsed_seconds).sum(),
            total_request_time,
        }
    }
}

/// Bookkeeping taken when a unit of work starts: when it began and where
/// its queries start in the log it reads.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub started_at: OffsetDateTime,
    pub log_offset: usize,
}

impl RequestContext {
    pub fn begin(log: &QueryLog) -> Self {
        Self {
            started_at: OffsetDateTime::now_utc(),
            log_offset: log.len(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        OffsetDateTime::now_utc() - self.started_at
    }

    /// Consumes the context, returning this unit's queries and its duration in seconds.
    pub fn finish(self, log: &QueryLog) -> (Vec<RawQueryRecord>, f64) {
        let elapsed = self.elapsed().as_seconds_f64();
        (log.since(self.log_offset), elapsed)
    }
}
