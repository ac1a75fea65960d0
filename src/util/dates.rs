use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses the date formats found in sitemaps, feeds and meta tags.
///
/// Accepts RFC 3339, RFC 2822, W3C datetimes with or without an offset,
/// and plain `YYYY-MM-DD` dates. Values without an offset are read as UTC.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // W3C datetime with a minute-precision offset, e.g. 2024-01-01T10:00+02:00
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    parse_naive(s).map(|naive| naive.and_utc())
}

/// Like [`parse_datetime`] but keeps the wall-clock time and discards any offset.
pub fn parse_naive_ignoring_tz(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.naive_local());
    }
    parse_naive(s)
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Whole days elapsed between `date` and `now`, ignoring time zones.
///
/// Returns `None` when `date` cannot be parsed.
pub fn days_between(date: &str, now: NaiveDateTime) -> Option<i64> {
    parse_naive_ignoring_tz(date).map(|then| (now - then).num_days())
}

/// Whole days elapsed since `date`, ignoring time zones.
pub fn days_since(date: &str) -> Option<i64> {
    days_between(date, Utc::now().naive_utc())
}
