use crate::error::ConfigError;
use crate::instrumentation::recorder::StackCapture;
use crate::instrumentation::traceback::TracebackFilter;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryInspectConfig {
    /// Master switch. Also requires the host to run in debug mode, see [`Self::with_debug`].
    pub enabled: bool,

    /// Warn on any single query slower than this (ms). Zero or negative flags everything.
    #[serde(alias = "absoluteLimit")]
    pub absolute_limit: Option<f64>,

    /// Attach the `x-queryinspect-*` headers to responses
    #[serde(alias = "headerStats")]
    pub header_stats: bool,

    /// Log every query of the request at INFO
    #[serde(alias = "log_queries", alias = "logAllQueries", alias = "logQueries")]
    pub log_all_queries: bool,

    /// Log each repeated query at WARN
    #[serde(alias = "logDuplicates")]
    pub log_duplicates: bool,

    /// Log the per-request summary line at INFO
    #[serde(alias = "logStats")]
    pub log_stats: bool,

    /// Capture call stacks at query execution and print them with duplicates
    #[serde(alias = "logTracebacks")]
    pub log_tracebacks: bool,

    /// Stacks printed per duplicate group
    #[serde(alias = "logTracebacksDuplicateLimit")]
    pub log_tracebacks_duplicate_limit: usize,

    /// Warn on queries slower than `mean + limit * deviation`
    #[serde(alias = "stddev_limit", alias = "standardDeviationLimit", alias = "stddevLimit")]
    pub standard_deviation_limit: Option<f64>,

    /// Path prefixes of frames worth reporting. Empty keeps every frame.
    #[serde(alias = "tracebackRoots")]
    pub traceback_roots: Vec<String>,

    /// Path prefixes dropped even when under a root
    #[serde(alias = "tracebackRootsExclude")]
    pub traceback_roots_exclude: Vec<String>,
}

impl Default for QueryInspectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            absolute_limit: None,
            header_stats: true,
            log_all_queries: false,
            log_duplicates: false,
            log_stats: true,
            log_tracebacks: false,
            log_tracebacks_duplicate_limit: 1,
            standard_deviation_limit: None,
            traceback_roots: Vec::new(),
            traceback_roots_exclude: Vec::new(),
        }
    }
}

impl QueryInspectConfig {
    /// Inspection only runs when the host is in debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.enabled = self.enabled && debug;
        self
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.log_tracebacks_duplicate_limit == 0 {
            return Err(ConfigError::DuplicateLimit(0));
        }
        if let Some(v) = self.absolute_limit.filter(|v| !v.is_finite()) {
            return Err(ConfigError::NotFinite { field: "absolute_limit", value: v });
        }
        if let Some(v) = self.standard_deviation_limit.filter(|v| !v.is_finite()) {
            return Err(ConfigError::NotFinite { field: "standard_deviation_limit", value: v });
        }
        Ok(self)
    }

    pub fn traceback_filter(&self) -> TracebackFilter {
        TracebackFilter::new(self.traceback_roots.clone(), self.traceback_roots_exclude.clone())
    }

    pub fn stack_capture(&self) -> StackCapture {
        if self.enabled && self.log_tracebacks {
            StackCapture::Enabled(self.traceback_filter())
        } else {
            StackCapture::Disabled
        }
    }
}
