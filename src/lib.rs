pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod output;
pub mod reconcile;

pub use api::{BackupSnapshot, DuplicatiClient};
pub use error::{Error, Result};
pub use metrics::registry::{MetricId, MetricKind, SENSORS};
pub use metrics::values::{BackupStatus, MetricValue, ReconciledMetrics};
pub use monitor::MonitorEngine;
pub use reconcile::reconcile;
