use crate::config::settings::QueryInspectConfig;
use crate::core::log::QueryLog;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing_subscriber::filter::{Directive, LevelFilter};

static GLOBAL: OnceCell<RwLock<QueryInspectConfig>> = OnceCell::new();
static SUBSCRIBER: OnceCell<()> = OnceCell::new();

// -------------------------------------------------------
// INITIATE (GLOBAL INIT + TRACING SETUP)
// -------------------------------------------------------
/// Stores `cfg` process-wide and installs the tracing subscriber once.
///
/// With the `sqlx` feature the subscriber also carries the layer that feeds
/// sqlx queries into `log`, capturing stacks when `cfg` asks for them.
/// Repeated calls replace the config but never reinstall the subscriber.
pub fn initiate(cfg: QueryInspectConfig, log: &QueryLog) {
    SUBSCRIBER.get_or_init(|| install_subscriber(&cfg, log));
    init_global(cfg);
    tracing::info!(target: "query_inspect", "query inspection initiated");
}

#[cfg_attr(not(feature = "sqlx"), allow(unused_variables))]
fn install_subscriber(cfg: &QueryInspectConfig, log: &QueryLog) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::from_default_env()
        .add_directive(directive("query_inspect=info"))
        .add_directive(directive("sqlx=info"));

    // the filter only gates printing; the query layer must see sqlx's debug events
    let fmt_layer = fmt::layer().with_target(true).with_filter(filter);

    #[cfg(feature = "sqlx")]
    {
        use crate::instrumentation::sql_events::SqlxQueryLog;

        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(SqlxQueryLog::new(log.clone(), cfg.stack_capture()))
            .try_init();
    }

    #[cfg(not(feature = "sqlx"))]
    {
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    }
}

fn directive(s: &str) -> Directive {
    s.parse().unwrap_or_else(|_| LevelFilter::INFO.into())
}

pub fn init_global(cfg: QueryInspectConfig) {
    let cell = GLOBAL.get_or_init(|| RwLock::new(QueryInspectConfig::default()));
    *cell.write() = cfg;
}

// -------------------------------------------------------
// GETTER
// -------------------------------------------------------
pub fn global() -> QueryInspectConfig {
    GLOBAL
        .get()
        .map(|g| g.read().clone())
        .unwrap_or_default()
}
