use crate::core::normalize::NormalizedQuery;

/// A query that ran longer than the threshold of one of the detectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlier<'a> {
    pub query: &'a NormalizedQuery,
    /// The threshold that was exceeded, in seconds.
    pub threshold_seconds: f64,
}

/// Flags every query slower than `limit_ms` milliseconds.
///
/// Only an absent limit disables the check; zero or negative limits flag
/// everything that took any time at all.
pub fn check_absolute_limit(queries: &[NormalizedQuery], limit_ms: Option<f64>) -> Vec<Outlier<'_>> {
    let Some(limit_ms) = limit_ms else {
        return Vec::new();
    };
    if queries.is_empty() {
        return Vec::new();
    }

    let threshold = limit_ms / 1000.0;
    flag_above(queries, threshold)
}

/// Deviation figure used by the statistical check.
///
/// `sqrt(1/(n-1) * sum(|x - mean|) / n)`, zero for fewer than two samples.
/// This is not the textbook standard deviation and the thresholds depend on it.
pub fn deviation(times: &[f64], mean: f64) -> f64 {
    let n = times.len();
    if n < 2 {
        return 0.0;
    }
    let spread: f64 = times.iter().map(|x| ((x - mean).powi(2)).sqrt()).sum();
    ((1.0 / (n as f64 - 1.0)) * (spread / n as f64)).sqrt()
}

/// Flags every query slower than `mean + limit * deviation`.
pub fn check_stddev_limit(queries: &[NormalizedQuery], limit: Option<f64>) -> Vec<Outlier<'_>> {
    let Some(limit) = limit else {
        return Vec::new();
    };
    let n = queries.len();
    if n == 0 {
        return Vec::new();
    }

    let times: Vec<f64> = queries.iter().map(|q| q.elapsed_seconds).collect();
    let total: f64 = times.iter().sum();
    let mean = total / n as f64;
    let threshold = mean + deviation(&times, mean) * limit;
    flag_above(queries, threshold)
}

fn flag_above(queries: &[NormalizedQuery], threshold: f64) -> Vec<Outlier<'_>> {
    queries
        .iter()
        .filter(|q| q.elapsed_seconds > threshold)
        .map(|query| Outlier { query, threshold_seconds: threshold })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(times: &[f64]) -> Vec<NormalizedQuery> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| NormalizedQuery {
                canonical_sql: format!("SELECT {i}"),
                elapsed_seconds: *t,
                call_stack: None,
                source_index: i,
            })
            .collect()
    }

    #[test]
    fn test_absent_limits_disable_checks() {
        let qs = queries(&[0.5, 10.0]);
        assert!(check_absolute_limit(&qs, None).is_empty());
        assert!(check_stddev_limit(&qs, None).is_empty());
    }

    #[test]
    fn test_absolute_limit_flags_every_slow_query() {
        let qs = queries(&[0.05, 0.2, 0.3]);
        let flagged = check_absolute_limit(&qs, Some(100.0));
        let idx: Vec<_> = flagged.iter().map(|o| o.query.source_index).collect();
        assert_eq!(idx, vec![1, 2]);
        assert_eq!(flagged[0].threshold_seconds, 0.1);
    }

    #[test]
    fn test_zero_limit_flags_nonzero_only() {
        let qs = queries(&[0.0, 0.001]);
        let flagged = check_absolute_limit(&qs, Some(0.0));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].query.source_index, 1);
    }

    #[test]
    fn test_negative_limit_always_triggers() {
        let qs = queries(&[0.0, 0.001]);
        assert_eq!(check_absolute_limit(&qs, Some(-1.0)).len(), 2);
    }

    #[test]
    fn test_single_query_never_statistical_outlier() {
        let qs = queries(&[3.0]);
        assert!(check_stddev_limit(&qs, Some(0.0)).is_empty());
        assert!(check_stddev_limit(&qs, Some(-5.0)).is_empty());
        assert_eq!(deviation(&[3.0], 3.0), 0.0);
    }

    #[test]
    fn test_deviation_formula() {
        let times = [0.01, 0.01, 0.01, 0.5];
        let mean = 0.1325;
        // sum |x - mean| = 3 * 0.1225 + 0.3675 = 0.735
        let expected = ((1.0 / 3.0) * (0.735 / 4.0_f64)).sqrt();
        assert!((deviation(&times, mean) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_stddev_limit_flags_spike() {
        let qs = queries(&[0.01, 0.01, 0.01, 0.5]);
        let flagged = check_stddev_limit(&qs, Some(1.0));
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].query.source_index, 3);
        assert!((flagged[0].threshold_seconds - 0.379987).abs() < 1e-5);
    }

    #[test]
    fn test_stddev_limit_zero_flags_above_mean() {
        let qs = queries(&[0.1, 0.2, 0.3]);
        let flagged = check_stddev_limit(&qs, Some(0.0));
        let idx: Vec<_> = flagged.iter().map(|o| o.query.source_index).collect();
        assert_eq!(idx, vec![2]);
    }
}
