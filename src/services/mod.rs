pub mod http;
pub mod wrap;

pub use http::{QueryInspect, QueryInspectMiddleware};
pub use wrap::{inspect_queries, inspect_queries_async, run_inspection, try_inspect_queries, try_run_inspection};
