pub mod prom;
pub mod report;

pub use report::{Report, ReportLine, Reporter};
