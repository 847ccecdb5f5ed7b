use chrono::{DateTime, Utc};

/// Returns the current timestamp in RFC 3339 format (e.g. "2026-10-16T10:30:45.123+00:00").
/// Used for the `installed_at` / `updated_at` marker fields and lock metadata.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Compact UTC stamp that is safe inside a file name, e.g. "20261016T103045".
/// Used to name the backup of a container that is being replaced.
pub fn file_stamp() -> String {
    Utc::now().format("%Y%m%dT%H%M%S").to_string()
}

/// Renders an RFC 3339 timestamp for humans; unparseable input is returned unchanged.
pub fn format_timestamp(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        Err(_) => ts.to_string(),
    }
}
