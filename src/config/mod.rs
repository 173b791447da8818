pub mod global;
pub mod settings;

pub use global::{global, init_global, initiate};
pub use settings::QueryInspectConfig;
