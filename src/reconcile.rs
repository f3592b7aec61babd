use crate::api::BackupSnapshot;
use crate::error::{Error, Result};
use crate::metrics::values::{BackupStatus, ReconciledMetrics};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp format used by the backend metadata, e.g. `20240101T000000Z`.
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Derive the authoritative status report from one metadata snapshot.
///
/// The snapshot reports "last successful backup" and "last error" as two
/// independent optional timestamps; whichever is more recent decides whether
/// the job is currently in an error state, and that choice decides which of
/// the remaining fields are meaningful this cycle.
pub fn reconcile(snapshot: &BackupSnapshot) -> Result<ReconciledMetrics> {
    let last_backup = parse_timestamp(snapshot.last_backup_date.as_deref())?;
    let last_error = parse_timestamp(snapshot.last_error_date.as_deref())?;

    let status = match (last_error, last_backup) {
        // Job has never run at all: no data yet, every metric stays unset.
        (None, None) => return Ok(ReconciledMetrics::default()),
        (Some(_), None) => BackupStatus::Error,
        (Some(error), Some(backup)) if error > backup => BackupStatus::Error,
        (Some(_), Some(_)) => BackupStatus::Ok,
        (None, Some(_)) => BackupStatus::Ok,
    };

    let metrics = match status {
        // A failed run never reports the size of a backup that didn't
        // complete, so everything but the error fields stays unset.
        BackupStatus::Error => ReconciledMetrics {
            status: Some(BackupStatus::Error),
            last_execution: last_error,
            error_message: snapshot.last_error_message.clone(),
            ..Default::default()
        },
        BackupStatus::Ok => ReconciledMetrics {
            status: Some(BackupStatus::Ok),
            last_execution: last_backup,
            duration_seconds: snapshot
                .last_backup_duration
                .as_deref()
                .map(parse_duration_seconds)
                .transpose()?,
            source_size: snapshot.source_files_size,
            source_files: snapshot.source_files_count,
            target_size: snapshot.target_files_size,
            target_files: snapshot.target_files_count,
            error_message: Some("-".to_string()),
        },
    };
    Ok(metrics)
}

fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else { return Ok(None) };
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| Error::MalformedData(format!("Invalid timestamp '{}': {}", raw, e)))?;
    Ok(Some(naive.and_utc()))
}

/// Parse a `HH:MM:SS.ffffff` duration into seconds, reduced to millisecond
/// precision: the six fractional digits are microseconds, rounded to the
/// nearest millisecond.
fn parse_duration_seconds(raw: &str) -> Result<f64> {
    let malformed = || Error::MalformedData(format!("Invalid duration '{}'", raw));

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 3 {
        return Err(malformed());
    }
    let hours: u64 = parts[0].parse().map_err(|_| malformed())?;
    let minutes: u64 = parts[1].parse().map_err(|_| malformed())?;
    let (whole, fraction) = parts[2].split_once('.').ok_or_else(malformed)?;
    let seconds: u64 = whole.parse().map_err(|_| malformed())?;

    // Pad the fractional digits out to microseconds, dropping any extras.
    let mut digits = format!("{:0<6}", fraction);
    digits.truncate(6);
    let microseconds: u64 = digits.parse().map_err(|_| malformed())?;
    let milliseconds = (microseconds as f64 / 1000.0).round();

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + milliseconds / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn backup_timestamp_alone_means_ok() {
        let snapshot = BackupSnapshot {
            last_backup_date: Some("20240101T000000Z".to_string()),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Ok));
        assert_eq!(metrics.last_execution, Some(utc(2024, 1, 1, 0, 0, 0)));
        assert_eq!(metrics.error_message.as_deref(), Some("-"));
        assert_eq!(metrics.duration_seconds, None);
        assert_eq!(metrics.source_size, None);
    }

    #[test]
    fn error_timestamp_alone_means_error() {
        let snapshot = BackupSnapshot {
            last_error_date: Some("20240102T030405Z".to_string()),
            last_error_message: Some("disk full".to_string()),
            // Stale counters from an earlier run must not leak through.
            source_files_size: Some(999),
            target_files_count: Some(4),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Error));
        assert_eq!(metrics.last_execution, Some(utc(2024, 1, 2, 3, 4, 5)));
        assert_eq!(metrics.error_message.as_deref(), Some("disk full"));
        assert_eq!(metrics.duration_seconds, None);
        assert_eq!(metrics.source_size, None);
        assert_eq!(metrics.source_files, None);
        assert_eq!(metrics.target_size, None);
        assert_eq!(metrics.target_files, None);
    }

    #[test]
    fn newer_error_wins_over_older_backup() {
        let snapshot = BackupSnapshot {
            last_backup_date: Some("20240101T000000Z".to_string()),
            last_error_date: Some("20240102T000000Z".to_string()),
            last_error_message: Some("disk full".to_string()),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Error));
        assert_eq!(metrics.last_execution, Some(utc(2024, 1, 2, 0, 0, 0)));
        assert_eq!(metrics.error_message.as_deref(), Some("disk full"));
    }

    #[test]
    fn newer_backup_wins_over_older_error() {
        let snapshot = BackupSnapshot {
            last_backup_date: Some("20240103T000000Z".to_string()),
            last_error_date: Some("20240102T000000Z".to_string()),
            last_backup_duration: Some("00:05:00.000000".to_string()),
            source_files_size: Some(2048),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Ok));
        assert_eq!(metrics.last_execution, Some(utc(2024, 1, 3, 0, 0, 0)));
        assert_eq!(metrics.duration_seconds, Some(300.0));
        assert_eq!(metrics.source_size, Some(2048));
    }

    #[test]
    fn simultaneous_timestamps_count_as_ok() {
        // The error must be strictly later to flip the state.
        let snapshot = BackupSnapshot {
            last_backup_date: Some("20240101T120000Z".to_string()),
            last_error_date: Some("20240101T120000Z".to_string()),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Ok));
    }

    #[test]
    fn no_timestamps_means_no_data_yet() {
        let metrics = reconcile(&BackupSnapshot::default()).unwrap();
        assert_eq!(metrics, ReconciledMetrics::default());
        assert!(metrics.status.is_none());
        // The key set stays closed even with nothing to report.
        assert_eq!(metrics.as_map().len(), 8);
    }

    #[test]
    fn error_without_message_leaves_message_unset() {
        let snapshot = BackupSnapshot {
            last_error_date: Some("20240102T000000Z".to_string()),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.status, Some(BackupStatus::Error));
        assert_eq!(metrics.error_message, None);
    }

    #[test]
    fn ok_branch_keeps_absent_fields_absent() {
        let snapshot = BackupSnapshot {
            last_backup_date: Some("20240101T000000Z".to_string()),
            target_files_size: Some(512),
            ..Default::default()
        };
        let metrics = reconcile(&snapshot).unwrap();
        assert_eq!(metrics.target_size, Some(512));
        // Absent upstream fields stay None, not zero.
        assert_eq!(metrics.source_size, None);
        assert_eq!(metrics.source_files, None);
        assert_eq!(metrics.target_files, None);
    }

    #[test]
    fn malformed_timestamp_is_a_typed_error() {
        let snapshot = BackupSnapshot {
            last_backup_date: Some("01/01/2024 00:00".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            reconcile(&snapshot),
            Err(Error::MalformedData(_))
        ));
    }

    #[test]
    fn duration_parses_to_millisecond_precision() {
        assert_eq!(parse_duration_seconds("01:02:03.500000").unwrap(), 3723.5);
        assert_eq!(parse_duration_seconds("00:00:00.000000").unwrap(), 0.0);
        // 999999 µs rounds up to a full second.
        assert_eq!(parse_duration_seconds("00:00:10.999999").unwrap(), 11.0);
    }

    #[test]
    fn duration_fraction_is_padded_and_truncated() {
        // Short fractions are microsecond digits, left-aligned.
        assert_eq!(parse_duration_seconds("00:00:03.5").unwrap(), 3.5);
        // Digits beyond microseconds are dropped before rounding.
        assert_eq!(parse_duration_seconds("00:00:01.2345678").unwrap(), 1.235);
    }

    #[test]
    fn malformed_duration_is_a_typed_error() {
        for raw in ["12:34", "aa:00:00.000000", "00:00:00", "00:00:xx.000000"] {
            let snapshot = BackupSnapshot {
                last_backup_date: Some("20240101T000000Z".to_string()),
                last_backup_duration: Some(raw.to_string()),
                ..Default::default()
            };
            assert!(
                matches!(reconcile(&snapshot), Err(Error::MalformedData(_))),
                "expected MalformedData for {:?}",
                raw
            );
        }
    }
}
