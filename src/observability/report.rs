use crate::config::QueryInspectConfig;
use crate::core::duplicates::DuplicateReport;
use crate::core::normalize::NormalizedQuery;
use crate::core::outliers::Outlier;
use crate::core::record::StackFrame;
use crate::core::stats::RequestStats;

use tracing::Level;

pub const HEADER_NUM_QUERIES: &str = "x-queryinspect-num-sql-queries";
pub const HEADER_SQL_TIME: &str = "x-queryinspect-total-sql-time";
pub const HEADER_REQUEST_TIME: &str = "x-queryinspect-total-request-time";
pub const HEADER_DUPLICATES: &str = "x-queryinspect-duplicate-sql-queries";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub level: Level,
    pub message: String,
}

/// Log lines and response headers for one inspected unit of work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub lines: Vec<ReportLine>,
    /// Empty unless `header_stats` is on.
    pub headers: Vec<(&'static str, String)>,
}

impl Report {
    pub fn emit(&self) {
        for line in &self.lines {
            // only WARN and INFO lines are ever built
            if line.level == Level::WARN {
                tracing::warn!(target: "query_inspect", "{}", line.message);
            } else {
                tracing::info!(target: "query_inspect", "{}", line.message);
            }
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.message.as_str())
    }

    fn warn(&mut self, message: String) {
        self.lines.push(ReportLine { level: Level::WARN, message });
    }

    fn info(&mut self, message: String) {
        self.lines.push(ReportLine { level: Level::INFO, message });
    }
}

/// Whole milliseconds, truncated toward zero.
pub fn whole_ms(seconds: f64) -> i64 {
    (seconds * 1000.0) as i64
}

/// Everything the detectors found for one unit of work.
pub struct Findings<'a> {
    pub queries: &'a [NormalizedQuery],
    pub duplicates: &'a DuplicateReport<'a>,
    pub stddev_outliers: &'a [Outlier<'a>],
    pub absolute_outliers: &'a [Outlier<'a>],
    pub stats: RequestStats,
}

pub struct Reporter<'c> {
    cfg: &'c QueryInspectConfig,
}

impl<'c> Reporter<'c> {
    pub fn new(cfg: &'c QueryInspectConfig) -> Self {
        Self { cfg }
    }

    pub fn build(&self, findings: &Findings<'_>) -> Report {
        let mut report = Report::default();
        self.duplicates(&mut report, findings.duplicates);
        self.stddev_outliers(&mut report, findings.stddev_outliers);
        self.absolute_outliers(&mut report, findings.absolute_outliers);
        self.stats(&mut report, &findings.stats);
        self.all_queries(&mut report, findings.queries);
        report
    }

    fn duplicates(&self, report: &mut Report, duplicates: &DuplicateReport<'_>) {
        if !self.cfg.log_duplicates {
            return;
        }

        for group in duplicates.repeated() {
            report.warn(format!("[SQL] repeated query ({}x): {}", group.count(), group.canonical_sql));
            if !self.cfg.log_tracebacks {
                continue;
            }
            for (idx, member) in group.traceback_members(self.cfg.log_tracebacks_duplicate_limit) {
                let frames = member.call_stack.as_deref().unwrap_or_default();
                report.warn(format!("[{idx}] Traceback:\n{}", format_frames(frames)));
            }
        }
    }

    fn stddev_outliers(&self, report: &mut Report, outliers: &[Outlier<'_>]) {
        let limit = self.cfg.standard_deviation_limit.unwrap_or_default();
        for o in outliers {
            report.warn(format!(
                "[SQL] query execution of {} ms over limit of {} ms ({} dev above mean): {}",
                whole_ms(o.query.elapsed_seconds),
                whole_ms(o.threshold_seconds),
                limit as i64,
                o.query.canonical_sql,
            ));
        }
    }

    fn absolute_outliers(&self, report: &mut Report, outliers: &[Outlier<'_>]) {
        for o in outliers {
            report.warn(format!(
                "[SQL] query execution of {} ms over absolute limit of {} ms: {}",
                whole_ms(o.query.elapsed_seconds),
                whole_ms(o.threshold_seconds),
                o.query.canonical_sql,
            ));
        }
    }

    fn stats(&self, report: &mut Report, stats: &RequestStats) {
        if self.cfg.log_stats {
            report.info(format!(
                "[SQL] {} queries ({} duplicates), {} ms SQL time, {} ms total request time",
                stats.query_count,
                stats.duplicate_count,
                whole_ms(stats.total_sql_time),
                whole_ms(stats.total_request_time),
            ));
        }

        if self.cfg.header_stats {
            report.headers = vec![
                (HEADER_NUM_QUERIES, stats.query_count.to_string()),
                (HEADER_SQL_TIME, format!("{} ms", whole_ms(stats.total_sql_time))),
                (HEADER_REQUEST_TIME, format!("{} ms", whole_ms(stats.total_request_time))),
                (HEADER_DUPLICATES, stats.duplicate_count.to_string()),
            ];
        }
    }

    fn all_queries(&self, report: &mut Report, queries: &[NormalizedQuery]) {
        if !self.cfg.log_all_queries {
            return;
        }

        for (idx, q) in queries.iter().enumerate() {
            let n = idx + 1;
            report.info(format!("[SQL] [{n}: {} ms] {}", whole_ms(q.elapsed_seconds), q.canonical_sql));
            if let Some(frames) = &q.call_stack {
                let latest = frames.last().map(ToString::to_string).unwrap_or_default();
                report.info(format!("[SQL] [{n}: Traceback] {latest}"));
            }
        }
    }
}

fn format_frames(frames: &[StackFrame]) -> String {
    frames.iter().map(|f| format!("{f}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::duplicates::group_duplicates;
    use crate::test_support::logged;

    fn q(sql: &str, t: f64, idx: usize) -> NormalizedQuery {
        NormalizedQuery { canonical_sql: sql.into(), elapsed_seconds: t, call_stack: None, source_index: idx }
    }

    fn stats(qs: &[NormalizedQuery], dups: usize, request: f64) -> RequestStats {
        RequestStats::new(qs, dups, request)
    }

    #[test]
    fn test_whole_ms_truncates() {
        assert_eq!(whole_ms(0.0127), 12);
        assert_eq!(whole_ms(0.0), 0);
        assert_eq!(whole_ms(-0.001), -1);
    }

    #[test]
    fn test_report_lines_are_warn_or_info() {
        let mut report = Report::default();
        report.warn("[SQL] repeated query (2x): SELECT 1".into());
        report.info("[SQL] 2 queries (1 duplicates), 0 ms SQL time, 0 ms total request time".into());
        assert_eq!(report.lines.iter().map(|l| l.level).collect::<Vec<_>>(), vec![Level::WARN, Level::INFO]);

        let text = logged(|| report.emit());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("WARN") && lines[0].contains("repeated query"));
        assert!(lines[1].contains("INFO") && lines[1].contains("2 queries"));
    }

    #[test]
    fn test_default_config_emits_stats_and_headers() {
        let cfg = QueryInspectConfig::default();
        let qs = vec![q("SELECT 1", 0.25, 0), q("SELECT 2", 0.5, 1)];
        let dups = group_duplicates(&qs);
        let findings = Findings {
            queries: &qs,
            duplicates: &dups,
            stddev_outliers: &[],
            absolute_outliers: &[],
            stats: stats(&qs, dups.excess, 1.0127),
        };
        let report = Reporter::new(&cfg).build(&findings);

        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].level, Level::INFO);
        assert_eq!(
            report.lines[0].message,
            "[SQL] 2 queries (0 duplicates), 750 ms SQL time, 1012 ms total request time"
        );
        assert_eq!(
            report.headers,
            vec![
                (HEADER_NUM_QUERIES, "2".to_string()),
                (HEADER_SQL_TIME, "750 ms".to_string()),
                (HEADER_REQUEST_TIME, "1012 ms".to_string()),
                (HEADER_DUPLICATES, "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_flags_gate_every_section() {
        let cfg = QueryInspectConfig { log_stats: false, header_stats: false, ..Default::default() };
        let qs = vec![q("SELECT 1", 0.25, 0), q("SELECT 1", 0.5, 1)];
        let dups = group_duplicates(&qs);
        let findings = Findings {
            queries: &qs,
            duplicates: &dups,
            stddev_outliers: &[],
            absolute_outliers: &[],
            stats: stats(&qs, dups.excess, 1.0),
        };
        let report = Reporter::new(&cfg).build(&findings);
        assert!(report.lines.is_empty());
        assert!(report.headers.is_empty());
    }

    #[test]
    fn test_duplicate_lines_with_tracebacks() {
        let cfg = QueryInspectConfig {
            log_duplicates: true,
            log_tracebacks: true,
            log_stats: false,
            log_tracebacks_duplicate_limit: 2,
            ..Default::default()
        };
        let frame = StackFrame { file: "/app/src/views.rs".into(), line: Some(7), function: "views::list".into() };
        let mut qs = vec![q("SELECT * FROM t WHERE id = ?", 0.1, 0), q("SELECT * FROM t WHERE id = ?", 0.1, 1)];
        qs[0].call_stack = Some(vec![frame.clone()]);
        qs[1].call_stack = Some(vec![frame]);
        let dups = group_duplicates(&qs);
        let findings = Findings {
            queries: &qs,
            duplicates: &dups,
            stddev_outliers: &[],
            absolute_outliers: &[],
            stats: stats(&qs, dups.excess, 1.0),
        };
        let report = Reporter::new(&cfg).build(&findings);
        let messages: Vec<_> = report.messages().collect();
        assert_eq!(
            messages,
            vec![
                "[SQL] repeated query (2x): SELECT * FROM t WHERE id = ?",
                "[1] Traceback:\n  at views::list (/app/src/views.rs:7)\n",
                "[2] Traceback:\n  at views::list (/app/src/views.rs:7)\n",
            ]
        );
        assert!(report.lines.iter().all(|l| l.level == Level::WARN));
    }

    #[test]
    fn test_outlier_lines() {
        let cfg = QueryInspectConfig {
            log_stats: false,
            standard_deviation_limit: Some(1.5),
            ..Default::default()
        };
        let qs = vec![q("SELECT big", 0.5, 0)];
        let dups = group_duplicates(&qs);
        let stddev = vec![Outlier { query: &qs[0], threshold_seconds: 0.38 }];
        let absolute = vec![Outlier { query: &qs[0], threshold_seconds: -0.001 }];
        let findings = Findings {
            queries: &qs,
            duplicates: &dups,
            stddev_outliers: &stddev,
            absolute_outliers: &absolute,
            stats: stats(&qs, 0, 1.0),
        };
        let report = Reporter::new(&cfg).build(&findings);
        let messages: Vec<_> = report.messages().collect();
        assert_eq!(
            messages,
            vec![
                "[SQL] query execution of 500 ms over limit of 380 ms (1 dev above mean): SELECT big",
                "[SQL] query execution of 500 ms over absolute limit of -1 ms: SELECT big",
            ]
        );
    }

    #[test]
    fn test_all_queries_dump() {
        let cfg = QueryInspectConfig { log_all_queries: true, log_stats: false, ..Default::default() };
        let mut qs = vec![q("SELECT 1", 0.25, 0), q("SELECT 2", 0.125, 1)];
        qs[1].call_stack = Some(vec![
            StackFrame { file: "/app/src/main.rs".into(), line: Some(1), function: "main".into() },
            StackFrame { file: "/app/src/views.rs".into(), line: Some(9), function: "views::detail".into() },
        ]);
        let dups = group_duplicates(&qs);
        let findings = Findings {
            queries: &qs,
            duplicates: &dups,
            stddev_outliers: &[],
            absolute_outliers: &[],
            stats: stats(&qs, 0, 1.0),
        };
        let report = Reporter::new(&cfg).build(&findings);
        let messages: Vec<_> = report.messages().collect();
        assert_eq!(
            messages,
            vec![
                "[SQL] [1: 250 ms] SELECT 1",
                "[SQL] [2: 125 ms] SELECT 2",
                "[SQL] [2: Traceback]   at views::detail (/app/src/views.rs:9)",
            ]
        );
    }
}
