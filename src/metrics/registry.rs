use serde::{Deserialize, Serialize};

/// Identifier of one exposed metric. The set is closed: every reconciled
/// result carries a value (possibly unset) for each of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Status,
    LastExecution,
    Duration,
    SourceSize,
    SourceFiles,
    TargetSize,
    TargetFiles,
    ErrorMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Status,
    Timestamp,
    DurationSeconds,
    Bytes,
    FileCount,
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct SensorDescription {
    pub id: MetricId,
    pub kind: MetricKind,
    pub name: &'static str,
    pub icon: &'static str,
}

/// The fixed sensor registry, in display order.
pub const SENSORS: [SensorDescription; 8] = [
    SensorDescription {
        id: MetricId::Status,
        kind: MetricKind::Status,
        name: "Status",
        icon: "mdi:shield-check",
    },
    SensorDescription {
        id: MetricId::LastExecution,
        kind: MetricKind::Timestamp,
        name: "Last execution",
        icon: "mdi:calendar-clock",
    },
    SensorDescription {
        id: MetricId::Duration,
        kind: MetricKind::DurationSeconds,
        name: "Duration",
        icon: "mdi:timer-outline",
    },
    SensorDescription {
        id: MetricId::SourceSize,
        kind: MetricKind::Bytes,
        name: "Source size",
        icon: "mdi:memory",
    },
    SensorDescription {
        id: MetricId::SourceFiles,
        kind: MetricKind::FileCount,
        name: "Source files",
        icon: "mdi:file-multiple",
    },
    SensorDescription {
        id: MetricId::TargetSize,
        kind: MetricKind::Bytes,
        name: "Target size",
        icon: "mdi:memory",
    },
    SensorDescription {
        id: MetricId::TargetFiles,
        kind: MetricKind::FileCount,
        name: "Target files",
        icon: "mdi:file-multiple",
    },
    SensorDescription {
        id: MetricId::ErrorMessage,
        kind: MetricKind::Text,
        name: "Error message",
        icon: "mdi:alert-circle-outline",
    },
];

impl MetricId {
    pub const ALL: [MetricId; 8] = [
        MetricId::Status,
        MetricId::LastExecution,
        MetricId::Duration,
        MetricId::SourceSize,
        MetricId::SourceFiles,
        MetricId::TargetSize,
        MetricId::TargetFiles,
        MetricId::ErrorMessage,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MetricId::Status => "last_backup_status",
            MetricId::LastExecution => "last_backup_execution",
            MetricId::Duration => "last_backup_duration",
            MetricId::SourceSize => "last_backup_source_size",
            MetricId::SourceFiles => "last_backup_source_files",
            MetricId::TargetSize => "last_backup_target_size",
            MetricId::TargetFiles => "last_backup_target_files",
            MetricId::ErrorMessage => "last_backup_error_message",
        }
    }
}
