use crate::config::QueryInspectConfig;
use crate::core::duplicates::group_duplicates;
use crate::core::normalize::normalize;
use crate::core::outliers::{check_absolute_limit, check_stddev_limit};
use crate::core::record::RawQueryRecord;
use crate::core::stats::RequestStats;
use crate::error::Result;
use crate::observability::report::{Findings, Report, Reporter};

use std::sync::Arc;

/// Outcome of inspecting one unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub stats: RequestStats,
    pub stddev_outliers: usize,
    pub absolute_outliers: usize,
    pub report: Report,
}

/// Runs the normalize -> duplicates -> outliers -> report pipeline.
#[derive(Clone, Default)]
pub struct Inspector {
    cfg: Arc<QueryInspectConfig>,
}

impl Inspector {
    pub fn new(cfg: QueryInspectConfig) -> Self {
        Self { cfg: Arc::new(cfg) }
    }

    pub fn config(&self) -> &QueryInspectConfig {
        &self.cfg
    }

    pub fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    /// `request_time` is the wall time of the unit of work in seconds.
    pub fn analyze(&self, records: &[RawQueryRecord], request_time: f64) -> Result<Analysis> {
        let queries = normalize(records)?;
        let duplicates = group_duplicates(&queries);
        let stddev = check_stddev_limit(&queries, self.cfg.standard_deviation_limit);
        let absolute = check_absolute_limit(&queries, self.cfg.absolute_limit);
        let stats = RequestStats::new(&queries, duplicates.excess, request_time);

        let report = Reporter::new(&self.cfg).build(&Findings {
            queries: &queries,
            duplicates: &duplicates,
            stddev_outliers: &stddev,
            absolute_outliers: &absolute,
            stats,
        });

        Ok(Analysis {
            stats,
            stddev_outliers: stddev.len(),
            absolute_outliers: absolute.len(),
            report,
        })
    }
}
