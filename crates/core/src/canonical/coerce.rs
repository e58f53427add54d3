//! Named coercions from raw JSON input to typed slot values, one per [`SlotKind`].
//!
//! Every function returns `None` when the input cannot be read unambiguously.
//! Nothing here guesses a zero.

use serde_json::Value;

use crate::domain::slot::{InvestmentProperty, SlotKind, SlotValue};

pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 2100;
pub const MAX_AGE: i64 = 150;

pub fn coerce(kind: SlotKind, raw: &Value, current_year: i32) -> Option<SlotValue> {
    match kind {
        SlotKind::Money | SlotKind::Number => number(raw).map(SlotValue::Number),
        SlotKind::Percent => percent(raw).map(SlotValue::Number),
        SlotKind::Boolean => boolean(raw).map(SlotValue::Bool),
        SlotKind::Year => year(raw, current_year).map(|year| SlotValue::Number(year as f64)),
        SlotKind::Count => count(raw).map(|count| SlotValue::Number(count as f64)),
        SlotKind::Text => text(raw).map(SlotValue::Text),
        SlotKind::Properties => properties(raw).map(SlotValue::Properties),
    }
}

/// Plain signed number. Strings may carry currency symbols, thousands
/// separators and trailing words ("£1,200 a month").
pub fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(value) => value.as_f64().filter(|value| value.is_finite()),
        Value::String(text) => first_decimal(&strip_separators(text)),
        _ => None,
    }
}

/// Fraction in 0..1. A `%` suffix or any value above 1 is read as a percentage.
pub fn percent(raw: &Value) -> Option<f64> {
    let (value, marked) = match raw {
        Value::Number(value) => (value.as_f64().filter(|value| value.is_finite())?, false),
        Value::String(text) => (first_decimal(&strip_separators(text))?, text.contains('%')),
        _ => return None,
    };

    if marked || value > 1.0 {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

pub fn boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(value) => Some(*value),
        Value::Number(value) => match value.as_f64() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "y" | "1" => Some(true),
            "no" | "false" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Calendar year. Integers in 1900..=2100 are years; integers up to 150 are ages
/// and become `current_year - age`. Text is scanned for a year first, then an age.
pub fn year(raw: &Value, current_year: i32) -> Option<i64> {
    match raw {
        Value::Number(value) => {
            let value = value.as_f64().filter(|value| value.is_finite())?;
            if value.fract() != 0.0 {
                return None;
            }
            year_or_age(value as i64, current_year)
        }
        Value::String(text) => {
            let tokens = integer_tokens(text);
            tokens
                .iter()
                .find(|token| token.len() == 4)
                .and_then(|token| token.parse::<i64>().ok())
                .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
                .or_else(|| {
                    tokens
                        .first()
                        .and_then(|token| token.parse::<i64>().ok())
                        .filter(|age| *age <= MAX_AGE)
                        .map(|age| i64::from(current_year) - age)
                })
        }
        _ => None,
    }
}

fn year_or_age(value: i64, current_year: i32) -> Option<i64> {
    if (MIN_YEAR..=MAX_YEAR).contains(&value) {
        Some(value)
    } else if (0..=MAX_AGE).contains(&value) {
        Some(i64::from(current_year) - value)
    } else {
        None
    }
}

/// Whole count, floored and clamped to zero. Text keeps its sign so that
/// `"-3"` and `-3` agree.
pub fn count(raw: &Value) -> Option<u64> {
    let value = match raw {
        Value::Number(value) => value.as_f64().filter(|value| value.is_finite())?,
        Value::String(text) => signed_decimal(text)?,
        _ => return None,
    };
    Some(floor_count(value))
}

pub fn floor_count(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}

pub fn text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

pub fn properties(raw: &Value) -> Option<Vec<InvestmentProperty>> {
    match raw {
        Value::Array(_) => serde_json::from_value(raw.clone()).ok(),
        _ => None,
    }
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|ch| !matches!(ch, ',' | '_' | '$' | '£' | '€' | ' ')).collect()
}

/// First `-?digits(.digits)?` run in `text`.
fn first_decimal(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().position(|ch| ch.is_ascii_digit())?;
    let negative = start > 0 && chars[start - 1] == '-';

    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() {
        let ch = chars[end];
        if ch.is_ascii_digit() {
            end += 1;
        } else if ch == '.' && !seen_dot && chars.get(end + 1).is_some_and(char::is_ascii_digit) {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }

    let digits: String = chars[start..end].iter().collect();
    let value = digits.parse::<f64>().ok()?;
    Some(if negative { -value } else { value })
}

/// `first_decimal`, also honouring a leading "minus" or "negative" word.
fn signed_decimal(text: &str) -> Option<f64> {
    let value = first_decimal(&strip_separators(text))?;
    let lowered = text.trim_start().to_ascii_lowercase();
    if value > 0.0 && (lowered.starts_with("minus") || lowered.starts_with("negative")) {
        Some(-value)
    } else {
        Some(value)
    }
}

fn integer_tokens(text: &str) -> Vec<String> {
    text.split(|ch: char| !ch.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}
