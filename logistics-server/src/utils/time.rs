//! 时间工具函数
//!
//! 所有日期→时间戳转换统一在 API handler 层完成，
//! repository 层只接收 `i64` Unix millis。

use chrono::{DateTime, Duration, NaiveDate, Utc};

use super::{AppError, AppResult};

/// Parse a date-range bound: accepts `YYYY-MM-DD` or RFC 3339.
///
/// Plain dates resolve to UTC midnight; pass `end_of_day = true` for the
/// inclusive upper bound of a `dateTo` filter.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> AppResult<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {value}")))?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .expect("in-range hms");
    Ok(naive.and_utc().timestamp_millis())
}

/// Day key (`YYYY-MM-DD`, UTC) for a millis timestamp
pub fn day_key(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// `[from, to]` window for a trailing range of `days` ending now.
///
/// `from` is UTC midnight of (today − days + 1), matching the dashboard's
/// zero-seeded calendar series.
pub fn trailing_window(days: i64) -> (i64, i64) {
    let now = Utc::now();
    let from_day = (now - Duration::days(days - 1)).date_naive();
    let from = from_day
        .and_hms_opt(0, 0, 0)
        .expect("midnight is valid")
        .and_utc()
        .timestamp_millis();
    (from, now.timestamp_millis())
}

/// Every day key between `from` and `to` millis, inclusive
pub fn day_keys_between(from: i64, to: i64) -> Vec<String> {
    let mut keys = Vec::new();
    let Some(start) = DateTime::<Utc>::from_timestamp_millis(from) else {
        return keys;
    };
    let Some(end) = DateTime::<Utc>::from_timestamp_millis(to) else {
        return keys;
    };
    let mut cursor = start.date_naive();
    let last = end.date_naive();
    while cursor <= last {
        keys.push(cursor.format("%Y-%m-%d").to_string());
        cursor = cursor.succ_opt().expect("date in range");
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates_and_rfc3339() {
        let start = parse_date_bound("2025-03-01", false).unwrap();
        let end = parse_date_bound("2025-03-01", true).unwrap();
        assert!(end - start < 24 * 60 * 60 * 1000);
        assert!(end > start);

        let rfc = parse_date_bound("2025-03-01T10:30:00Z", false).unwrap();
        assert!(rfc > start && rfc < end);

        assert!(parse_date_bound("03/01/2025", false).is_err());
    }

    #[test]
    fn day_keys_cover_range_inclusive() {
        let from = parse_date_bound("2025-02-27", false).unwrap();
        let to = parse_date_bound("2025-03-02", false).unwrap();
        let keys = day_keys_between(from, to);
        assert_eq!(
            keys,
            vec!["2025-02-27", "2025-02-28", "2025-03-01", "2025-03-02"]
        );
    }

    #[test]
    fn trailing_window_spans_requested_days() {
        let (from, to) = trailing_window(7);
        assert_eq!(day_keys_between(from, to).len(), 7);
    }
}
