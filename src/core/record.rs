use crate::error::{InspectError, Result};
use serde::Deserialize;
use std::fmt;

/// One frame of a captured call stack.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StackFrame {
    pub file: String,
    pub line: Option<u32>,
    pub function: String,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "  at {} ({}:{})", self.function, self.file, line),
            None => write!(f, "  at {} ({})", self.function, self.file),
        }
    }
}

/// Elapsed time as the query log stores it: seconds, either numeric or as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Seconds(f64),
    Text(String),
}

impl RawTime {
    /// Finite seconds only: `"nan"` and `"inf"` parse as floats but are not times.
    pub fn seconds(&self) -> Option<f64> {
        let s = match self {
            RawTime::Seconds(s) => *s,
            RawTime::Text(t) => t.trim().parse::<f64>().ok()?,
        };
        s.is_finite().then_some(s)
    }
}

impl From<f64> for RawTime {
    fn from(s: f64) -> Self {
        RawTime::Seconds(s)
    }
}

impl From<&str> for RawTime {
    fn from(s: &str) -> Self {
        RawTime::Text(s.to_string())
    }
}

/// An entry of the ORM's debug query log. `sql` is `None` for non-query entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawQueryRecord {
    pub sql: Option<String>,
    pub time: RawTime,
    #[serde(default)]
    pub tb: Option<Vec<StackFrame>>,
}

impl RawQueryRecord {
    pub fn new(sql: impl Into<String>, time: impl Into<RawTime>) -> Self {
        Self { sql: Some(sql.into()), time: time.into(), tb: None }
    }

    pub fn with_stack(mut self, tb: Vec<StackFrame>) -> Self {
        self.tb = Some(tb);
        self
    }

    /// Parses the time field. `index` is the record's position in the request slice.
    pub fn elapsed_seconds(&self, index: usize) -> Result<f64> {
        self.time.seconds().ok_or_else(|| InspectError::InvalidQueryTime {
            index,
            value: match &self.time {
                RawTime::Seconds(s) => s.to_string(),
                RawTime::Text(t) => t.clone(),
            },
        })
    }
}
