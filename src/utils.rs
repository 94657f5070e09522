// Utility functions
use chrono::{DateTime, NaiveDateTime, Utc};

const SNAPSHOT_STAMP: &str = "%Y%m%d_%H%M%S_%3f";

/// Parses an RFC 3339 string into `DateTime<Utc>`, if possible.
pub fn parse_datetime(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Snapshot base name shared by the textual and binary artifacts.
pub fn snapshot_name(timestamp: &DateTime<Utc>) -> String {
    format!("dataset_{}", timestamp.format(SNAPSHOT_STAMP))
}

/// Name of the raw ingestion archive captured at `timestamp`.
pub fn raw_archive_name(timestamp: &DateTime<Utc>) -> String {
    format!("raw_data_{}", timestamp.format(SNAPSHOT_STAMP))
}

/// Recovers the capture instant (millisecond precision) from a snapshot name.
pub fn parse_snapshot_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix("dataset_")?;
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_STAMP)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_name_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::milliseconds(42);
        let name = snapshot_name(&ts);
        assert_eq!(name, "dataset_20240309_140507_042");
        assert_eq!(raw_archive_name(&ts), "raw_data_20240309_140507_042");
        assert_eq!(parse_snapshot_name(&name), Some(ts));
        assert_eq!(parse_snapshot_name("levels_20240309"), None);
    }

    #[test]
    fn test_parse_datetime() {
        assert!(parse_datetime("2024-03-09T14:05:07+02:00").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }
}
