//! Numeric input handling. Form fields arrive as text; anything that is not a
//! finite, non-negative number is rejected rather than quietly read as zero.

use serde::{de, Deserialize, Deserializer};

use crate::errors::ValidationError;

/// Parses a required, non-negative quantity, rate or price.
pub fn parse_amount(field: &'static str, input: &str) -> Result<f64, ValidationError> {
    parse_optional(field, input)?.ok_or(ValidationError::Missing(field))
}

/// As `parse_amount`, but blank input means "not given".
pub fn parse_optional(field: &'static str, input: &str) -> Result<Option<f64>, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let value = input
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field,
            input: input.to_string(),
        })?;
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(Some(value))
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Two-decimal rendering used for derived fields and reports.
pub fn format2(value: f64) -> String {
    format!("{:.2}", value)
}

// Records written by older clients carry numbers as text, eg: `"31.00"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Deserializes a number that may have been stored as text.
pub fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    lenient_optional(deserializer)?.ok_or_else(|| de::Error::custom("expected a number"))
}

/// As `lenient`, with `null` and blank text read as absent.
pub fn lenient_optional<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a number, got {:?}", s))),
    }
}
