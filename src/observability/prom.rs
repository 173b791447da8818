use crate::core::pipeline::Analysis;

use actix_web::HttpResponse;
use once_cell::sync::OnceCell;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

static REGISTRY: OnceCell<Registry> = OnceCell::new();
static METRICS: OnceCell<Metrics> = OnceCell::new();

struct Metrics {
    requests: IntCounter,
    queries: Histogram,
    sql_time: Histogram,
    duplicates: IntCounter,
    slow: IntCounterVec,
}

fn default_buckets_seconds() -> Vec<f64> {
    vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
}

fn query_count_buckets() -> Vec<f64> {
    vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0]
}

fn build(registry: &Registry) -> prometheus::Result<Metrics> {
    let requests = IntCounter::new("query_inspect_requests_total", "Inspected units of work")?;
    let queries = Histogram::with_opts(
        HistogramOpts::new("query_inspect_sql_queries_per_request", "SQL queries per inspected request")
            .buckets(query_count_buckets()),
    )?;
    let sql_time = Histogram::with_opts(
        HistogramOpts::new("query_inspect_sql_time_seconds", "Cumulative SQL time per request (s)")
            .buckets(default_buckets_seconds()),
    )?;
    let duplicates = IntCounter::new("query_inspect_duplicate_queries_total", "Repeated SQL executions beyond the first")?;
    let slow = IntCounterVec::new(
        Opts::new("query_inspect_slow_queries_total", "Queries over a time limit"),
        &["policy"], // "absolute" or "stddev"
    )?;

    registry.register(Box::new(requests.clone()))?;
    registry.register(Box::new(queries.clone()))?;
    registry.register(Box::new(sql_time.clone()))?;
    registry.register(Box::new(duplicates.clone()))?;
    registry.register(Box::new(slow.clone()))?;

    Ok(Metrics { requests, queries, sql_time, duplicates, slow })
}

pub fn init_prometheus() {
    let registry = REGISTRY.get_or_init(Registry::new);
    if METRICS.get().is_some() {
        return;
    }
    match build(registry) {
        Ok(m) => {
            METRICS.set(m).ok();
        }
        Err(e) => tracing::warn!(target: "query_inspect", "prometheus init failed: {}", e),
    }
}

pub fn observe_analysis(analysis: &Analysis) {
    let Some(m) = METRICS.get() else {
        return;
    };
    m.requests.inc();
    m.queries.observe(analysis.stats.query_count as f64);
    m.sql_time.observe(analysis.stats.total_sql_time);
    m.duplicates.inc_by(analysis.stats.duplicate_count as u64);
    m.slow.with_label_values(&["absolute"]).inc_by(analysis.absolute_outliers as u64);
    m.slow.with_label_values(&["stddev"]).inc_by(analysis.stddev_outliers as u64);
}

pub async fn metrics_handler() -> HttpResponse {
    init_prometheus();
    let registry = REGISTRY.get_or_init(Registry::new);
    encode(registry)
}

fn encode(registry: &Registry) -> HttpResponse {
    let encoder = TextEncoder::new();
    let mf = registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&mf, &mut buf) {
        return HttpResponse::InternalServerError().body(format!("encode error: {e}"));
    }
    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buf)
}
