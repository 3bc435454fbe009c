//! Reading tool arguments produced by the planner.
//!
//! Planner output is imprecise, so readers accept the common shapes a model
//! emits (numbers as strings, dates with or without a time) and the optional
//! numeric fields are coerced rather than rejected. Every coercion is returned
//! as a note so callers can report it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use crate::errors::{AgentError, AgentResult};

pub type Arguments = Map<String, Value>;

pub const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = 1..=3;
pub const DEFAULT_PRIORITY: u8 = 1;
pub const FALLBACK_PRIORITY: u8 = 2;

/// Which end of a date range a date-only value stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    Start,
    End,
}

fn present<'a>(args: &'a Arguments, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|value| !value.is_null())
}

/// Integers may arrive as JSON integers, integral floats or numeric strings
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

pub fn required_str(args: &Arguments, name: &str) -> AgentResult<String> {
    match present(args, name) {
        Some(Value::String(text)) if !text.trim().is_empty() => Ok(text.trim().to_string()),
        Some(Value::String(_)) => Err(AgentError::InvalidParameters(format!(
            "'{}' must not be empty",
            name
        ))),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(_) => Err(AgentError::InvalidParameters(format!(
            "'{}' must be a string",
            name
        ))),
        None => Err(AgentError::InvalidParameters(format!(
            "Missing required parameter '{}'",
            name
        ))),
    }
}

/// Blank strings read as absent
pub fn optional_str(args: &Arguments, name: &str) -> Option<String> {
    match present(args, name)? {
        Value::String(text) if text.trim().is_empty() => None,
        Value::String(text) => Some(text.trim().to_string()),
        other => Some(other.to_string()),
    }
}

pub fn required_id(args: &Arguments, name: &str) -> AgentResult<i64> {
    let value = present(args, name).ok_or_else(|| {
        AgentError::InvalidParameters(format!("Missing required parameter '{}'", name))
    })?;
    as_integer(value).ok_or_else(|| {
        AgentError::InvalidParameters(format!("'{}' must be an integer, got {}", name, value))
    })
}

pub fn optional_id(args: &Arguments, name: &str) -> AgentResult<Option<i64>> {
    match present(args, name) {
        None => Ok(None),
        Some(value) => as_integer(value).map(Some).ok_or_else(|| {
            AgentError::InvalidParameters(format!("'{}' must be an integer, got {}", name, value))
        }),
    }
}

/// Booleans also accept "true"/"false" and 1/0; anything else is `default`
pub fn flag(args: &Arguments, name: &str, default: bool) -> bool {
    match present(args, name) {
        Some(Value::Bool(value)) => *value,
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => true,
            "false" | "no" | "0" => false,
            _ => default,
        },
        Some(Value::Number(number)) => number.as_i64().map_or(default, |n| n != 0),
        _ => default,
    }
}

/// Parse a date given as `YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]`, the same with a `T`
/// separator, or RFC 3339 with an offset (converted to UTC). A date-only value
/// becomes the start or end of that day.
pub fn parse_datetime(text: &str, bound: DayBound) -> AgentResult<NaiveDateTime> {
    let text = text.trim();

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(match bound {
            DayBound::Start => date.and_time(NaiveTime::MIN),
            DayBound::End => date.and_time(end_of_day()),
        });
    }

    let naive = text.trim_end_matches('Z').replacen('T', " ", 1);
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(&naive, format) {
            return Ok(datetime);
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Ok(datetime.naive_utc());
    }

    Err(AgentError::InvalidParameters(format!(
        "Invalid date '{}': expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS",
        text
    )))
}

pub fn optional_datetime(
    args: &Arguments,
    name: &str,
    bound: DayBound,
) -> AgentResult<Option<NaiveDateTime>> {
    optional_str(args, name)
        .map(|text| parse_datetime(&text, bound))
        .transpose()
}

pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Absent priority is the default (low); anything outside 1–3 or non-numeric
/// becomes medium, with a note describing the coercion.
pub fn priority(args: &Arguments) -> (u8, Option<String>) {
    let Some(value) = present(args, "priority") else {
        return (DEFAULT_PRIORITY, None);
    };

    match as_integer(value) {
        Some(level) if PRIORITY_RANGE.contains(&level) => (level as u8, None),
        _ => (
            FALLBACK_PRIORITY,
            Some(format!(
                "priority {} is outside 1-3, using {}",
                value, FALLBACK_PRIORITY
            )),
        ),
    }
}

/// Numbers may arrive as JSON numbers or numeric strings
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}

/// Hour counts are whole and non-negative. Fractions are rounded and negatives
/// become 0, each with a note; values that are not numbers are dropped with a note.
pub fn hours(args: &Arguments, name: &str) -> (Option<u32>, Option<String>) {
    let Some(value) = present(args, name) else {
        return (None, None);
    };

    let Some(number) = as_number(value) else {
        return (
            None,
            Some(format!("{} {} is not a number of hours, ignoring it", name, value)),
        );
    };

    let whole = number.round().clamp(0.0, f64::from(u32::MAX)) as u32;
    if f64::from(whole) == number {
        (Some(whole), None)
    } else {
        (
            Some(whole),
            Some(format!("{} {} is not a whole number of hours, using {}", name, value, whole)),
        )
    }
}
