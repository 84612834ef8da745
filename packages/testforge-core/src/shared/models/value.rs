//! Scalar values shared by the constraint extractor, the solver and the report

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A concrete value of one of the three solver sorts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarValue {
    Int(i128),
    Real(f64),
    Bool(bool),
}

impl ScalarValue {
    /// Numeric view; booleans coerce to 0/1 the way C does.
    pub fn as_f64(&self) -> f64 {
        match *self {
            ScalarValue::Int(v) => v as f64,
            ScalarValue::Real(v) => v,
            ScalarValue::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match *self {
            ScalarValue::Int(v) => Some(v),
            ScalarValue::Bool(b) => Some(b as i128),
            ScalarValue::Real(_) => None,
        }
    }

    /// C truthiness: any non-zero value is true.
    pub fn truthy(&self) -> bool {
        match *self {
            ScalarValue::Int(v) => v != 0,
            ScalarValue::Real(v) => v != 0.0,
            ScalarValue::Bool(b) => b,
        }
    }

    /// Numeric comparison across sorts
    pub fn compare(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    /// Parse a C literal token (`42`, `0x1F`, `017`, `10u`, `1.5f`, `'a'`, `true`).
    pub fn parse_c_literal(text: &str) -> Option<ScalarValue> {
        let t = text.trim();
        match t {
            "" => return None,
            "true" => return Some(ScalarValue::Bool(true)),
            "false" => return Some(ScalarValue::Bool(false)),
            _ => {}
        }

        if let Some(inner) = t.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return parse_char_literal(inner).map(ScalarValue::Int);
        }

        let (negative, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, t.strip_prefix('+').unwrap_or(t)),
        };

        let value = parse_unsigned_literal(body)?;
        Some(if negative { value.negate() } else { value })
    }

    fn negate(self) -> ScalarValue {
        match self {
            ScalarValue::Int(v) => ScalarValue::Int(-v),
            ScalarValue::Real(v) => ScalarValue::Real(-v),
            ScalarValue::Bool(b) => ScalarValue::Int(-(b as i128)),
        }
    }
}

fn parse_unsigned_literal(body: &str) -> Option<ScalarValue> {
    let lower = body.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix("0x") {
        let digits = hex.trim_end_matches(['u', 'l']);
        return i128::from_str_radix(digits, 16).ok().map(ScalarValue::Int);
    }

    let is_float = lower.contains('.')
        || (lower.contains('e') && lower.chars().next().is_some_and(|c| c.is_ascii_digit()));
    if is_float {
        let digits = lower.trim_end_matches(['f', 'l']);
        return digits.parse::<f64>().ok().map(ScalarValue::Real);
    }

    let digits = lower.trim_end_matches(['u', 'l']);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return i128::from_str_radix(&digits[1..], 8).ok().map(ScalarValue::Int);
    }
    digits.parse::<i128>().ok().map(ScalarValue::Int)
}

fn parse_char_literal(inner: &str) -> Option<i128> {
    let mut chars = inner.chars();
    match (chars.next()?, chars.next()) {
        ('\\', Some(esc)) => {
            let code = match esc {
                'n' => 10,
                't' => 9,
                'r' => 13,
                '0' => 0,
                '\\' => 92,
                '\'' => 39,
                '"' => 34,
                'a' => 7,
                'b' => 8,
                'f' => 12,
                'v' => 11,
                _ => return None,
            };
            Some(code)
        }
        (c, None) => Some(c as i128),
        _ => None,
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::Real(v) => write!(f, "{v}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Closed numeric range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: ScalarValue,
    pub max: ScalarValue,
}

impl ValueRange {
    pub fn new(min: ScalarValue, max: ScalarValue) -> Self {
        Self { min, max }
    }

    pub fn ints(min: i128, max: i128) -> Self {
        Self::new(ScalarValue::Int(min), ScalarValue::Int(max))
    }

    pub fn reals(min: f64, max: f64) -> Self {
        Self::new(ScalarValue::Real(min), ScalarValue::Real(max))
    }

    pub fn contains(&self, v: &ScalarValue) -> bool {
        !matches!(self.min.compare(v), Some(Ordering::Greater) | None)
            && !matches!(self.max.compare(v), Some(Ordering::Less) | None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer_literals() {
        assert_eq!(ScalarValue::parse_c_literal("42"), Some(ScalarValue::Int(42)));
        assert_eq!(ScalarValue::parse_c_literal("0x1F"), Some(ScalarValue::Int(31)));
        assert_eq!(ScalarValue::parse_c_literal("017"), Some(ScalarValue::Int(15)));
        assert_eq!(ScalarValue::parse_c_literal("10UL"), Some(ScalarValue::Int(10)));
        assert_eq!(ScalarValue::parse_c_literal("-5"), Some(ScalarValue::Int(-5)));
        assert_eq!(ScalarValue::parse_c_literal("0"), Some(ScalarValue::Int(0)));
    }

    #[test]
    fn test_parse_other_literals() {
        assert_eq!(ScalarValue::parse_c_literal("1.5f"), Some(ScalarValue::Real(1.5)));
        assert_eq!(ScalarValue::parse_c_literal("'a'"), Some(ScalarValue::Int(97)));
        assert_eq!(ScalarValue::parse_c_literal("'\\n'"), Some(ScalarValue::Int(10)));
        assert_eq!(ScalarValue::parse_c_literal("true"), Some(ScalarValue::Bool(true)));
        assert_eq!(ScalarValue::parse_c_literal("x"), None);
        assert_eq!(ScalarValue::parse_c_literal("MAX_LEN"), None);
    }

    #[test]
    fn test_range_contains() {
        let r = ValueRange::ints(0, 100);
        assert!(r.contains(&ScalarValue::Int(0)));
        assert!(r.contains(&ScalarValue::Int(100)));
        assert!(!r.contains(&ScalarValue::Int(101)));
        assert!(r.contains(&ScalarValue::Real(50.5)));
    }
}
