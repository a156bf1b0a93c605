//! Conversion of locale-formatted cell text into numbers.
//!
//! Everything here is pure: callers decide whether a `Missing` result is worth
//! logging or dropping a row over.

use crate::constants::SENTINEL;
use crate::types::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Trailing unit words. The unit is already part of the field name, so the
/// number is kept as written ("1.23 billion" is 1.23).
static UNIT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(billion|million|bn|mn)\s*$").unwrap());

/// Footnote markers such as "[1]" or "[n 2]".
static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

fn strip_footnotes(text: &str) -> Cow<'_, str> {
    FOOTNOTE.replace_all(text.trim(), "")
}

/// True when the text is the designated "intentionally absent" token,
/// footnote markers aside ("—[1]" counts).
pub fn is_sentinel(text: &str) -> bool {
    strip_footnotes(text).trim() == SENTINEL
}

/// Parses `text` into `Value::Number`, or `Value::Missing` for the sentinel and
/// for anything that is not a finite number once separators and units are gone.
pub fn parse_numeric(text: &str) -> Value {
    let without_notes = strip_footnotes(text);
    let trimmed = without_notes.trim();
    if trimmed.is_empty() || trimmed == SENTINEL {
        return Value::Missing;
    }

    let without_unit = UNIT_SUFFIX.replace(trimmed, "");
    let cleaned: String = without_unit
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Missing,
    }
}

/// Canonical text form of a number; `parse_numeric` reads it back unchanged.
pub fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// Rounds to two decimal places, halves away from zero.
///
/// Magnitudes too large to scale by 100 carry no fractional digits and come
/// back unchanged.
pub fn round2(n: f64) -> f64 {
    let scaled = n * 100.0;
    if !scaled.is_finite() {
        return n;
    }
    scaled.round() / 100.0
}
