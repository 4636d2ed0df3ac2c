//! Display formatting for file sizes and message timestamps.

use chrono::{DateTime, Datelike, Duration, Utc};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Humanize a byte count: `0 B`, `512 B`, `1.5 KB`, `10 MB`.
///
/// At most two decimals, trailing zeros trimmed.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

/// Render a message timestamp relative to `now`: time-of-day for today,
/// a marked time for yesterday, date plus time otherwise.
pub fn format_timestamp(timestamp_ms: i64, now: DateTime<Utc>) -> String {
    let Some(instant) = DateTime::<Utc>::from_timestamp_millis(timestamp_ms) else {
        return "--:--".to_owned();
    };

    let today = now.date_naive();
    let date = instant.date_naive();
    if date == today {
        return instant.format("%H:%M").to_string();
    }
    if date == today - Duration::days(1) {
        return instant.format("yesterday %H:%M").to_string();
    }
    if date.year() == today.year() {
        return instant.format("%m-%d %H:%M").to_string();
    }
    instant.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_file_sizes_with_trimmed_decimals() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(format_file_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn formats_timestamps_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();

        let today = Utc.with_ymd_and_hms(2026, 3, 10, 9, 30, 0).unwrap();
        assert_eq!(format_timestamp(today.timestamp_millis(), now), "09:30");

        let yesterday = Utc.with_ymd_and_hms(2026, 3, 9, 22, 15, 0).unwrap();
        assert_eq!(
            format_timestamp(yesterday.timestamp_millis(), now),
            "yesterday 22:15"
        );

        let same_year = Utc.with_ymd_and_hms(2026, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(
            format_timestamp(same_year.timestamp_millis(), now),
            "01-02 08:00"
        );

        let older = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            format_timestamp(older.timestamp_millis(), now),
            "2025-12-31 23:59"
        );
    }
}
