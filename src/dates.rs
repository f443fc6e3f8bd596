//! Date expressions
//!
//! Time range settings accept absolute dates (`2024-01-31`), RFC 3339
//! timestamps, `now`/`today`/`yesterday`, relative expressions such as
//! `5 days ago`, and `last run`.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Fallback start when `last run` is requested before any run happened
pub const DEFAULT_DATE_FROM: &str = "1990-01-01";

/// Overlap subtracted from the previous run timestamp
pub const LAST_RUN_OVERLAP_SECS: i64 = 3600;

/// Regex for relative dates: `<n> <unit>(s) ago`
static RELATIVE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago$").unwrap()
});

/// Parse a date expression into unix seconds, relative to the current time
pub fn parse_date(expr: &str, last_run: Option<i64>) -> Result<i64> {
    parse_date_at(expr, last_run, Utc::now())
}

/// Parse a date expression into unix seconds, relative to `now`
pub fn parse_date_at(expr: &str, last_run: Option<i64>, now: DateTime<Utc>) -> Result<i64> {
    let normalized = expr.trim().to_lowercase();

    if matches!(normalized.as_str(), "last" | "lastrun" | "last run") {
        let previous = match last_run {
            Some(ts) => ts,
            None => midnight(DEFAULT_DATE_FROM)?,
        };
        return Ok(previous - LAST_RUN_OVERLAP_SECS);
    }

    match normalized.as_str() {
        "now" | "today" => return Ok(now.timestamp()),
        "yesterday" => return Ok((now - Duration::days(1)).timestamp()),
        _ => {}
    }

    if let Some(caps) = RELATIVE_REGEX.captures(&normalized) {
        let amount: u32 = caps[1].parse().map_err(|_| invalid(expr))?;
        let then = match &caps[2] {
            "minute" => now.checked_sub_signed(Duration::minutes(i64::from(amount))),
            "hour" => now.checked_sub_signed(Duration::hours(i64::from(amount))),
            "day" => now.checked_sub_signed(Duration::days(i64::from(amount))),
            "week" => now.checked_sub_signed(Duration::weeks(i64::from(amount))),
            "month" => now.checked_sub_months(Months::new(amount)),
            "year" => amount
                .checked_mul(12)
                .and_then(|months| now.checked_sub_months(Months::new(months))),
            _ => None,
        };
        return then.map(|dt| dt.timestamp()).ok_or_else(|| invalid(expr));
    }

    if let Ok(ts) = midnight(&normalized) {
        return Ok(ts);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(expr.trim()) {
        return Ok(dt.timestamp());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(expr.trim(), "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp());
    }

    Err(invalid(expr))
}

/// `YYYY-MM-DD` at 00:00 UTC
fn midnight(date: &str) -> Result<i64> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| invalid(date))
}

fn invalid(expr: &str) -> Error {
    Error::config(format!(
        "Failed to parse date '{expr}', make sure the date is either in YYYY-MM-DD format \
         or relative date i.e. 5 days ago, 1 month ago, yesterday, etc."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap()
    }

    #[test_case("2024-01-01", 1_704_067_200 ; "plain date")]
    #[test_case("2024-01-01T01:00:00Z", 1_704_070_800 ; "rfc3339")]
    #[test_case("2024-01-01T01:00:00+01:00", 1_704_067_200 ; "rfc3339 offset")]
    #[test_case("2024-01-01 00:00:30", 1_704_067_230 ; "date and time")]
    #[test_case("now", 1_711_886_400 ; "now")]
    #[test_case("Today", 1_711_886_400 ; "today")]
    #[test_case("yesterday", 1_711_800_000 ; "yesterday")]
    #[test_case("2 hours ago", 1_711_879_200 ; "hours ago")]
    #[test_case("1 day ago", 1_711_800_000 ; "one day ago")]
    #[test_case("5 days ago", 1_711_454_400 ; "days ago")]
    #[test_case("1 week ago", 1_711_281_600 ; "week ago")]
    #[test_case("1 month ago", 1_709_208_000 ; "month ago clamps to month end")]
    #[test_case("1 year ago", 1_680_264_000 ; "year ago")]
    fn test_parse_date(expr: &str, expected: i64) {
        assert_eq!(parse_date_at(expr, None, now()).unwrap(), expected);
    }

    #[test_case("last" ; "last")]
    #[test_case("lastrun" ; "lastrun")]
    #[test_case("Last Run" ; "last run")]
    fn test_last_run(expr: &str) {
        assert_eq!(
            parse_date_at(expr, Some(1_700_000_000), now()).unwrap(),
            1_700_000_000 - 3600
        );
    }

    #[test]
    fn test_last_run_without_state() {
        // 1990-01-01T00:00:00Z
        assert_eq!(parse_date_at("last", None, now()).unwrap(), 631_152_000 - 3600);
    }

    #[test_case("" ; "empty")]
    #[test_case("soon" ; "word")]
    #[test_case("2024-13-01" ; "bad month")]
    #[test_case("5 fortnights ago" ; "unknown unit")]
    fn test_invalid_date(expr: &str) {
        let err = parse_date_at(expr, None, now()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }
}
