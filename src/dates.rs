//! Calendar helpers: week bounds, human date input and lenient instant parsing.
//!
//! Weeks start on Monday and end on Sunday everywhere in the crate.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde_json::Value;

use crate::error::{BoardError, BoardResult};

/// Monday and Sunday of the ISO week containing `day`.
pub fn start_end_of_week(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = day.weekday().num_days_from_monday() as i64;
    let start = day - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Calendar day of an instant as seen from the time zone `tz`.
pub fn local_day<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Parse human-readable date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "end of week" / "eow", "end of month" / "eom"
/// - "in 3d", "in 2w", "in 1m"
/// - weekday names, "next monday", "this friday"
/// - "YYYY-MM-DD"
pub fn parse_day_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(start_end_of_week(today).1),
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        if let Some((idx, unit)) = rest.char_indices().last() {
            if let Ok(n) = rest[..idx].trim().parse::<i64>() {
                let offset = match unit {
                    'd' => Some(Duration::try_days(n)),
                    'w' => Some(Duration::try_weeks(n)),
                    // Approximate: 30 days per month
                    'm' => Some(n.checked_mul(30).and_then(Duration::try_days)),
                    _ => None,
                };
                if let Some(offset) = offset {
                    return offset.and_then(|d| today.checked_add_signed(d));
                }
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let days_ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {}", name) {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", name) {
            let add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Parse date input from the command line into an instant.
///
/// Full RFC 3339 instants are taken as-is; day-level input resolves to the start
/// of that day in the time zone of `now`.
pub fn parse_instant_input<Tz: TimeZone>(
    s: &str,
    now: &DateTime<Tz>,
) -> BoardResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
        return Ok(dt.with_timezone(&Utc));
    }
    let day = parse_day_input(s, now.date_naive())
        .ok_or_else(|| BoardError::UnparseableDate { input: s.to_string() })?;
    start_of_day(day, &now.timezone())
        .ok_or_else(|| BoardError::UnparseableDate { input: s.to_string() })
}

fn start_of_day<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let midnight = day.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Best-effort instant from loosely structured data.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`
/// strings and bare `YYYY-MM-DD` dates (read as UTC), epoch milliseconds, and
/// `{"seconds": .., "nanoseconds": ..}` timestamp objects.
pub fn parse_loose_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_loose_str(s),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => {
            let secs = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(secs, u32::try_from(nanos).ok()?).single()
        }
        _ => None,
    }
}

fn parse_loose_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Format a due day relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let days = (due - today).num_days();
    match days {
        0 => "today".into(),
        1 => "tomorrow".into(),
        d if d > 1 => format!("in {}d", d),
        d => format!("{}d late", -d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    fn wed() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
    }

    #[test]
    fn test_week_bounds_monday_to_sunday() {
        let (start, end) = start_end_of_week(wed());
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 3, 17).unwrap());

        let sunday = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(start_end_of_week(sunday).0, start);
    }

    #[test]
    fn test_parse_day_input_relative_forms() {
        assert_eq!(parse_day_input("today", wed()), Some(wed()));
        assert_eq!(parse_day_input("in 3d", wed()), NaiveDate::from_ymd_opt(2024, 3, 16));
        assert_eq!(parse_day_input("in 2w", wed()), NaiveDate::from_ymd_opt(2024, 3, 27));
        assert_eq!(parse_day_input("eow", wed()), NaiveDate::from_ymd_opt(2024, 3, 17));
        assert_eq!(parse_day_input("eom", wed()), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(parse_day_input("friday", wed()), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(parse_day_input("next wednesday", wed()), NaiveDate::from_ymd_opt(2024, 3, 20));
        assert_eq!(parse_day_input("2024-12-01", wed()), NaiveDate::from_ymd_opt(2024, 12, 1));
        assert_eq!(parse_day_input("someday", wed()), None);
        assert_eq!(parse_day_input("in 999999999999d", wed()), None);
        assert_eq!(parse_day_input("in 9223372036854775807m", wed()), None);
        assert_eq!(parse_day_input("in -999999999999w", wed()), None);
    }

    #[test]
    fn test_parse_instant_input_uses_caller_zone() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 13, 12, 0, 0).unwrap();
        let due = parse_instant_input("tomorrow", &now).unwrap();
        assert_eq!(due, Utc.with_ymd_and_hms(2024, 3, 13, 22, 0, 0).unwrap());

        let exact = parse_instant_input("2024-03-20T08:00:00Z", &now).unwrap();
        assert_eq!(exact, Utc.with_ymd_and_hms(2024, 3, 20, 8, 0, 0).unwrap());

        let err = parse_instant_input("whenever", &now).unwrap_err();
        assert!(matches!(err, BoardError::UnparseableDate { .. }));

        let err = parse_instant_input("in 999999999999d", &now).unwrap_err();
        assert!(matches!(err, BoardError::UnparseableDate { .. }));
    }

    #[test]
    fn test_parse_loose_instant_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_loose_instant(&json!("2024-01-05")), Some(expected));
        assert_eq!(parse_loose_instant(&json!("2024-01-05T00:00:00Z")), Some(expected));
        assert_eq!(parse_loose_instant(&json!("2024-01-05T00:00:00")), Some(expected));
        assert_eq!(parse_loose_instant(&json!(expected.timestamp_millis())), Some(expected));
        assert_eq!(
            parse_loose_instant(&json!({"seconds": expected.timestamp(), "nanoseconds": 0})),
            Some(expected)
        );
        assert_eq!(parse_loose_instant(&json!("not a date")), None);
        assert_eq!(parse_loose_instant(&json!(null)), None);
    }

    #[test]
    fn test_format_due_relative() {
        assert_eq!(format_due_relative(wed(), wed()), "today");
        assert_eq!(format_due_relative(wed() + Duration::days(1), wed()), "tomorrow");
        assert_eq!(format_due_relative(wed() + Duration::days(4), wed()), "in 4d");
        assert_eq!(format_due_relative(wed() - Duration::days(2), wed()), "2d late");
    }
}
