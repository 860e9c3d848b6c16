//! Forgiving parsers for user-entered numbers. Bad input degrades to a default.

use serde::{Deserialize, Deserializer};

pub fn parse_number_or(raw: &str, fallback: f64) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}

/// Integer prefix semantics: `"3.7"` reads as 3.
pub fn parse_whole_or(raw: &str, fallback: i64) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return fallback;
    }
    let value = parse_number_or(trimmed, f64::NAN).trunc();
    if value.is_finite() && value.abs() < 9.0e15 {
        value as i64
    } else {
        fallback
    }
}

pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Number(f64),
    Flag(bool),
}

/// Accepts a string, a number, a bool or null and keeps it as text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Loose>::deserialize(deserializer)?;
    Ok(match raw {
        None => String::new(),
        Some(Loose::Text(text)) => text,
        Some(Loose::Number(number)) => format_number(number),
        Some(Loose::Flag(flag)) => flag.to_string(),
    })
}
