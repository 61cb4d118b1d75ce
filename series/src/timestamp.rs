//! Multi-format timestamp parsing.
//!
//! Inputs arrive as free-form strings and are normalized to epoch
//! milliseconds through a fixed three-stage fallback:
//!
//! 1. structured time expression — `now`, a relative offset such as `-1h`
//!    or `now+30m`, or a strict RFC 3339 instant;
//! 2. base-10 integer, interpreted as epoch milliseconds;
//! 3. free-form calendar date, tried against a fixed list of
//!    locale-independent formats (interpreted as UTC).
//!
//! The first stage that succeeds wins. Stage order is fixed: purely numeric
//! input must be claimed by the integer stage, so the expression grammar
//! requires a unit suffix on offsets. Only when all three stages fail does
//! parsing error out, carrying every stage's failure for diagnostics.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::Clock;

use crate::error::{Error, Result};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

/// Date formats tried by the free-form stage, in order.
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parses a timestamp input into epoch milliseconds.
///
/// The clock supplies "now" for relative expressions; inject a mock clock
/// to make expression parsing deterministic in tests.
pub fn parse(input: &str, clock: &dyn Clock) -> Result<i64> {
    let expression = match parse_expression(input, clock.now_ms()) {
        Ok(at) => return Ok(at),
        Err(e) => e,
    };
    let integer = match parse_epoch_integer(input) {
        Ok(at) => return Ok(at),
        Err(e) => e,
    };
    let date = match parse_calendar_date(input) {
        Ok(at) => return Ok(at),
        Err(e) => e,
    };
    Err(Error::UnparseableTimestamp {
        input: input.to_string(),
        expression,
        integer,
        date,
    })
}

/// Stage 1: compact time-expression grammar.
///
/// Accepts `now`, `now` followed by a signed offset, a bare offset relative
/// to now (`-1h`, `+2d`, `30m`), or a strict RFC 3339 instant. Offset units
/// are `s`, `m`, `h`, `d`, `w`.
fn parse_expression(input: &str, now_ms: i64) -> std::result::Result<i64, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("empty input".to_string());
    }
    if trimmed == "now" {
        return Ok(now_ms);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.timestamp_millis());
    }
    let offset = trimmed.strip_prefix("now").unwrap_or(trimmed);
    let delta = parse_offset(offset)?;
    now_ms
        .checked_add(delta)
        .ok_or_else(|| format!("offset out of range: `{trimmed}`"))
}

/// Parses a signed offset with a mandatory unit suffix, e.g. `-1h`.
fn parse_offset(input: &str) -> std::result::Result<i64, String> {
    let (sign, magnitude) = match input.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, input.strip_prefix('+').unwrap_or(input)),
    };
    let Some(unit) = magnitude.chars().last() else {
        return Err("empty offset".to_string());
    };
    let unit_ms = match unit {
        's' => MS_PER_SECOND,
        'm' => MS_PER_MINUTE,
        'h' => MS_PER_HOUR,
        'd' => MS_PER_DAY,
        'w' => MS_PER_WEEK,
        _ => return Err(format!("`{input}` is not a time expression")),
    };
    let digits = &magnitude[..magnitude.len() - 1];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("`{input}` is not a time expression"));
    }
    let count: i64 = digits
        .parse()
        .map_err(|e| format!("offset out of range: {e}"))?;
    count
        .checked_mul(unit_ms)
        .map(|total| sign * total)
        .ok_or_else(|| format!("offset out of range: `{input}`"))
}

/// Stage 2: base-10 integer epoch milliseconds.
fn parse_epoch_integer(input: &str) -> std::result::Result<i64, String> {
    input.trim().parse::<i64>().map_err(|e| e.to_string())
}

/// Stage 3: free-form calendar date, interpreted as UTC.
fn parse_calendar_date(input: &str) -> std::result::Result<i64, String> {
    let trimmed = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(instant.timestamp_millis());
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc()
                .timestamp_millis());
        }
    }
    Err("no known date format matched".to_string())
}
