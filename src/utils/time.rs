use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// True when `at` lies strictly less than `window_secs` before `now`
pub fn is_within(at: DateTime<Utc>, window_secs: i64, now: DateTime<Utc>) -> bool {
    (now - at).num_milliseconds() < window_secs * 1000
}

/// Parse the timestamp formats the backend is known to emit: RFC 3339,
/// naive `YYYY-MM-DD HH:MM:SS` (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Short human date used across the dashboard, e.g. `Mar 5, 2026`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_current_timestamp() {
        let ts = current_timestamp();
        // Should be a reasonable timestamp (after 2020-01-01)
        assert!(ts > 1577836800);
        // Should be before 2100-01-01
        assert!(ts < 4102444800);
    }

    #[test]
    fn test_current_timestamp_millis() {
        let ts_millis = current_timestamp_millis();
        let ts_secs = current_timestamp();

        let diff = (ts_millis / 1000 - ts_secs).abs();
        assert!(diff <= 1);
    }

    #[test]
    fn test_is_within() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        assert!(is_within(now - Duration::seconds(299), 300, now));
        // Edge case: exactly at the window is outside
        assert!(!is_within(now - Duration::seconds(300), 300, now));
        assert!(!is_within(now - Duration::hours(2), 300, now));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 5, 8, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2026-03-05T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-05T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-05 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-03-05T08:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2026-03-05"),
            Some(Utc.with_ymd_and_hms(2026, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_format_date() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 8, 30, 0).unwrap();
        assert_eq!(format_date(at), "Mar 5, 2026");
    }
}
