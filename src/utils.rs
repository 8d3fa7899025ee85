//! Helpers for date display and log-friendly string handling.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use tracing::warn;

/// Display format for article dates, e.g. `05月06日`.
pub const DISPLAY_DATE_FORMAT: &str = "%m月%d日";

/// Today's date in display form.
pub fn display_date_now() -> String {
    Local::now().format(DISPLAY_DATE_FORMAT).to_string()
}

/// Convert a raw timestamp string from a feed or API into display form.
///
/// Accepts RFC 2822 (`Tue, 06 May 2025 10:00:00 +0000`), RFC 3339, and the
/// bare ISO shapes news APIs commonly emit. When nothing parses the current
/// date is used; that fallback is logged distinctly from transport failures
/// so monitoring can tell a stale parse from a source being down.
pub fn display_date_or_now(raw: Option<&str>, source: &str) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return display_date_now();
    };
    match parse_datetime(raw) {
        Some(dt) => dt.format(DISPLAY_DATE_FORMAT).to_string(),
        None => {
            warn!(%source, raw, fallback = "now", "Unparseable publication date");
            display_date_now()
        }
    }
}

/// Try the accepted timestamp shapes in order. The result is the timestamp
/// in the publisher's own offset; display dates are not shifted into the
/// machine's timezone.
fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?);
    }
    None
}

/// Truncate a string for logging, counting characters so multi-byte text
/// (CJK headlines) never splits mid-character.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, s.chars().count() - max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc2822() {
        let dt = parse_datetime("Tue, 06 May 2025 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-05-06");
    }

    #[test]
    fn test_parse_rfc3339_and_bare_iso() {
        assert!(parse_datetime("2025-05-06T10:00:00Z").is_some());
        assert!(parse_datetime("2025-05-06T10:00:00").is_some());
        assert!(parse_datetime("2025-05-06 10:00:00").is_some());
        assert!(parse_datetime("2025-05-06").is_some());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_datetime("yesterday-ish").is_none());
        assert!(parse_datetime("06/05/2025").is_none());
    }

    #[test]
    fn test_display_date_or_now_falls_back() {
        // Unparseable input still yields a usable display string.
        let s = display_date_or_now(Some("not a date"), "test");
        assert!(s.contains('月'));
        let s = display_date_or_now(None, "test");
        assert!(s.contains('日'));
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 chars)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "人工智能".repeat(50);
        let result = truncate_for_log(&s, 10);
        assert!(result.starts_with("人工智能人工智能人工"));
    }
}
