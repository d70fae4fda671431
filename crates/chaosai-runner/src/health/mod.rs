//! Application health checks during a trial

pub mod summary;
pub mod watcher;

pub use summary::{
    failure_ratio, response_time_outliers, summarize_response_time, summarize_success_rate,
    HealthSummary,
};
pub use watcher::{HealthCheckWatcher, WatcherState};
