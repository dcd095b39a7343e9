//! BT-012: Append-only JSONL run event log.

use crate::core::types::{RunEvent, TimestampedEvent};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// File name of the event log inside the log directory.
pub const EVENT_LOG: &str = "events.jsonl";

fn unix_now() -> std::time::Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// UTC timestamp, e.g. `2026-03-01T14:05:09Z`.
pub fn now_iso8601() -> String {
    format_iso8601(unix_now().as_secs())
}

/// Format seconds since the epoch as an ISO 8601 UTC timestamp.
pub fn format_iso8601(secs: u64) -> String {
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    let of_day = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        of_day / 3600,
        (of_day % 3600) / 60,
        of_day % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Short unique id for one run.
pub fn generate_run_id() -> String {
    let nanos = unix_now().as_nanos();
    format!("run-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

pub fn event_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(EVENT_LOG)
}

/// Append one timestamped event to `<log_dir>/events.jsonl`.
pub fn append_event(log_dir: &Path, event: RunEvent) -> Result<(), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| format!("cannot create log dir {}: {}", log_dir.display(), e))?;

    let line = serde_json::to_string(&TimestampedEvent {
        ts: now_iso8601(),
        event,
    })
    .map_err(|e| format!("JSON serialize error: {}", e))?;

    let path = event_log_path(log_dir);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;
    writeln!(file, "{}", line).map_err(|e| format!("write error: {}", e))
}
