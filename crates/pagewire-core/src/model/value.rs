// ── Dynamically typed state values ──
//
// StateStore cells hold one of three scalar kinds. Absence is modelled
// with `Option<Value>` at the store boundary, never as a variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single StateStore value.
///
/// Deserializes untagged, so `true`, `5`, and `"5"` in a rule file map to
/// `Bool`, `Number`, and `Text` respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Infer a value from loosely typed input such as a CLI `key=value`.
    ///
    /// `true`/`false` (any case) become `Bool`, anything `f64` accepts
    /// becomes `Number`, everything else is `Text`.
    pub fn infer(raw: &str) -> Self {
        if let Some(b) = parse_bool(raw) {
            return Self::Bool(b);
        }
        match raw.trim().parse::<f64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(raw.to_owned()),
        }
    }

    /// Numeric view used by ordering comparisons.
    ///
    /// Text that parses as `f64` counts as numeric; booleans never do.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short type tag for diagnostics and tabular output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
        }
    }
}

/// Case-insensitive `true` / `false`.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<usize> for Value {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn from(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}
