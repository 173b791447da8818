pub mod duplicates;
pub mod log;
pub mod normalize;
pub mod outliers;
pub mod pipeline;
pub mod record;
pub mod stats;
pub mod task_ctx;

pub use duplicates::{group_duplicates, DuplicateGroup, DuplicateReport};
pub use log::QueryLog;
pub use normalize::{canonical_sql, normalize, NormalizedQuery};
pub use outliers::{check_absolute_limit, check_stddev_limit, Outlier};
pub use pipeline::{Analysis, Inspector};
pub use record::{RawQueryRecord, RawTime, StackFrame};
pub use stats::{RequestContext, RequestStats};
pub use task_ctx::{current_log, REQUEST_LOG};
