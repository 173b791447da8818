use crate::core::record::{RawQueryRecord, StackFrame};
use crate::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

// Only "= <integer>" is collapsed; string and list literals stay distinct.
static SQL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=\s*\d+").expect("static regex"));

/// A query in canonical form, ready for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    pub canonical_sql: String,
    pub elapsed_seconds: f64,
    pub call_stack: Option<Vec<StackFrame>>,
    pub source_index: usize,
}

pub fn canonical_sql(sql: &str) -> String {
    SQL_ID_PATTERN.replace_all(sql, "= ?").into_owned()
}

/// Drops entries without SQL text and canonicalizes the rest.
///
/// `source_index` is the record's position in `records`. A time value that
/// does not parse fails the whole batch.
pub fn normalize(records: &[RawQueryRecord]) -> Result<Vec<NormalizedQuery>> {
    let mut out = Vec::with_capacity(records.len());
    for (idx, rec) in records.iter().enumerate() {
        let Some(sql) = rec.sql.as_deref() else {
            continue;
        };
        out.push(NormalizedQuery {
            canonical_sql: canonical_sql(sql),
            elapsed_seconds: rec.elapsed_seconds(idx)?,
            call_stack: rec.tb.clone(),
            source_index: idx,
        });
    }
    Ok(out)
}
