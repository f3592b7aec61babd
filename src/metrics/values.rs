use crate::metrics::registry::MetricId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Ok,
    Error,
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupStatus::Ok => write!(f, "OK"),
            BackupStatus::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Status(BackupStatus),
    Timestamp(DateTime<Utc>),
    Seconds(f64),
    Bytes(u64),
    Count(u64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Status(s) => write!(f, "{}", s),
            MetricValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            MetricValue::Seconds(s) => write!(f, "{:.1}s", s),
            MetricValue::Bytes(b) => write!(f, "{} B", b),
            MetricValue::Count(c) => write!(f, "{}", c),
            MetricValue::Text(t) => write!(f, "{}", t),
        }
    }
}

/// One reconciled status report. Every registry metric has a field here;
/// a field left `None` means "no value this cycle", never "key missing".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciledMetrics {
    pub status: Option<BackupStatus>,
    pub last_execution: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    pub source_size: Option<u64>,
    pub source_files: Option<u64>,
    pub target_size: Option<u64>,
    pub target_files: Option<u64>,
    pub error_message: Option<String>,
}

impl ReconciledMetrics {
    pub fn get(&self, id: MetricId) -> Option<MetricValue> {
        match id {
            MetricId::Status => self.status.map(MetricValue::Status),
            MetricId::LastExecution => self.last_execution.map(MetricValue::Timestamp),
            MetricId::Duration => self.duration_seconds.map(MetricValue::Seconds),
            MetricId::SourceSize => self.source_size.map(MetricValue::Bytes),
            MetricId::SourceFiles => self.source_files.map(MetricValue::Count),
            MetricId::TargetSize => self.target_size.map(MetricValue::Bytes),
            MetricId::TargetFiles => self.target_files.map(MetricValue::Count),
            MetricId::ErrorMessage => self.error_message.clone().map(MetricValue::Text),
        }
    }

    /// Full metric mapping: always exactly the registry's key set, with
    /// unset metrics present as `None`.
    pub fn as_map(&self) -> BTreeMap<&'static str, Option<MetricValue>> {
        MetricId::ALL
            .into_iter()
            .map(|id| (id.key(), self.get(id)))
            .collect()
    }
}
