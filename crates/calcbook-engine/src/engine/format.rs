//! Result formatting for display.
//!
//! Raw results are classified (number, boolean, array, object, text) and
//! numbers are rendered per the calculation's `numberFormat`:
//!
//! - `decimal`: fixed places with thousands separators (`1,234.50`)
//! - `scientific`: exponential notation (`1.23e+3`)
//! - `engineering`: exponent a multiple of three (`1.23E3`)
//! - `percent`: value × 100 with a trailing `%`

use serde_json::Value;

use super::calculation::{Calculation, NumberFormat, ResultFormat, Settings};
use super::value::is_truthy;

/// Upper bound on fixed decimal places.
const MAX_DECIMAL_PLACES: usize = 20;

/// Number rendering resolved from calculation overrides and global settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NumberStyle {
    pub format: NumberFormat,
    pub decimal_places: usize,
}

impl NumberStyle {
    pub fn for_calculation(calculation: &Calculation, settings: &Settings) -> NumberStyle {
        NumberStyle {
            format: calculation
                .number_format
                .unwrap_or(settings.default_number_format),
            decimal_places: calculation
                .decimal_places
                .unwrap_or(settings.default_decimal_places)
                .min(MAX_DECIMAL_PLACES),
        }
    }
}

/// Format a raw result per the calculation's display settings.
pub fn format_result(result: &Value, calculation: &Calculation, settings: &Settings) -> Value {
    let style = NumberStyle::for_calculation(calculation, settings);
    let kind = match calculation.result_format {
        ResultFormat::Auto => classify(result),
        explicit => explicit,
    };

    match kind {
        ResultFormat::Number => format_numeric(result, style),
        ResultFormat::Boolean => {
            Value::String(if is_truthy(result) { "True" } else { "False" }.to_string())
        }
        ResultFormat::Array | ResultFormat::Object => format_members(result, style),
        ResultFormat::Text | ResultFormat::Auto => result.clone(),
    }
}

/// Detect the result class from its run-time shape.
pub fn classify(value: &Value) -> ResultFormat {
    match value {
        Value::Number(_) => ResultFormat::Number,
        Value::Bool(_) => ResultFormat::Boolean,
        Value::Array(_) => ResultFormat::Array,
        Value::Object(_) => ResultFormat::Object,
        Value::String(_) | Value::Null => ResultFormat::Text,
    }
}

fn format_numeric(value: &Value, style: NumberStyle) -> Value {
    match value.as_f64() {
        Some(n) => Value::String(format_number(n, style)),
        None => value.clone(),
    }
}

/// Format numeric members of arrays and objects; other members pass through.
fn format_members(value: &Value, style: NumberStyle) -> Value {
    match value {
        Value::Number(_) => format_numeric(value, style),
        Value::Array(items) => Value::Array(items.iter().map(|v| format_members(v, style)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), format_members(v, style)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Format a number for display.
pub fn format_number(n: f64, style: NumberStyle) -> String {
    if n.is_nan() {
        return "#NAN!".to_string();
    }
    if n.is_infinite() {
        return "#INF!".to_string();
    }

    let places = style.decimal_places;
    match style.format {
        NumberFormat::Decimal => group_thousands(&format!("{:.*}", places, n)),
        NumberFormat::Scientific => exponential(n, places),
        NumberFormat::Engineering => engineering(n, places),
        NumberFormat::Percent => format!("{:.*}%", places, n * 100.0),
    }
}

/// Insert `,` separators into the integer part of a fixed-point string.
fn group_thousands(fixed: &str) -> String {
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Exponential notation with an explicitly signed exponent (`1.23e+3`).
fn exponential(n: f64, places: usize) -> String {
    let raw = format!("{:.*e}", places, n);
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => raw,
    }
}

fn engineering(n: f64, places: usize) -> String {
    let exp = if n == 0.0 {
        0
    } else {
        ((n.abs().log10() / 3.0).floor() * 3.0) as i32
    };
    let mantissa = n / 10f64.powi(exp);
    format!("{:.*}E{}", places, mantissa, exp)
}
