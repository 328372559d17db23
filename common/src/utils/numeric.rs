//! Normalization of loosely typed numeric fields.
//!
//! Upstream documents encode the same quantity as a JSON integer, a float
//! with no fractional part, a decimal string or a `0x` hex string. Every
//! extraction site funnels through [`normalize`] so the accepted forms stay
//! identical everywhere.

use serde::{Deserialize, Serialize};

/// A number exactly as it appeared in a document, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    pub fn normalize(&self) -> Option<u64> {
        match self {
            RawNumber::Unsigned(n) => Some(*n),
            RawNumber::Signed(n) => u64::try_from(*n).ok(),
            RawNumber::Float(f) => from_float(*f),
            RawNumber::Text(s) => parse_text(s),
        }
    }
}

impl From<u64> for RawNumber {
    fn from(value: u64) -> Self {
        RawNumber::Unsigned(value)
    }
}

/// Normalizes an arbitrary JSON value into an unsigned integer.
///
/// Returns `None` for negatives, fractional floats, unparsable strings and
/// non-numeric values.
pub fn normalize(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().and_then(|i| u64::try_from(i).ok()))
            .or_else(|| n.as_f64().and_then(from_float)),
        serde_json::Value::String(s) => parse_text(s),
        _ => None,
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal string.
pub fn parse_text(s: &str) -> Option<u64> {
    let trimmed = s.trim();
    match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u64>().ok(),
    }
}

fn from_float(f: f64) -> Option<u64> {
    if !f.is_finite() || f < 0.0 || f.fract() != 0.0 || f > u64::MAX as f64 {
        return None;
    }
    Some(f as u64)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
