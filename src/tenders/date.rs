//! Platform date normalization.
//!
//! The listing service encodes dates the ASP.NET way, as epoch milliseconds
//! wrapped in a string: `"/Date(1700000000000)/"`, sometimes with a trailing
//! offset such as `"/Date(1700000000000+0000)/"`.

use chrono::DateTime;
use regex::Regex;
use std::sync::LazyLock;

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Convert a platform date string to a UTC calendar date (`YYYY-MM-DD`).
///
/// The first run of digits is read as epoch milliseconds. Returns `None` for
/// empty input, input without digits, or a value outside chrono's range.
pub fn parse_platform_date(raw: &str) -> Option<String> {
    let digits = DIGIT_RUN.find(raw)?.as_str();
    let millis: i64 = digits.parse().ok()?;
    let date = DateTime::from_timestamp_millis(millis)?;
    Some(date.format("%Y-%m-%d").to_string())
}
