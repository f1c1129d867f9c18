//! Numerals pulled out of query strings, and the arithmetic done on them.

use crate::errors::ErrorKind;
use std::fmt;

/// A numeral extracted from free text.
///
/// Integers stay integers through [`Number::next`]; a `.` anywhere in the
/// numeral makes it a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Keeps the ASCII digits and `.` of `text`, in order, and parses them.
    ///
    /// Every other character is dropped, the sign included: `-5` reads as `5`.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidNumber`] when nothing is left or the leftover does
    /// not parse (`1.2.3`, or an integer beyond `i64`).
    ///
    /// # Examples
    /// ```
    /// use webroot::Number;
    ///
    /// assert_eq!(Number::extract("number=5").unwrap(), Number::Int(5));
    /// assert_eq!(Number::extract("w=2.5cm").unwrap(), Number::Float(2.5));
    /// assert!(Number::extract("number=").is_err());
    /// ```
    pub fn extract(text: &str) -> Result<Self, ErrorKind> {
        let numeral: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let invalid = || ErrorKind::InvalidNumber(text.to_owned());

        if numeral.contains('.') {
            numeral.parse().map(Number::Float).map_err(|_| invalid())
        } else {
            numeral.parse().map(Number::Int).map_err(|_| invalid())
        }
    }

    /// `self + 1`, keeping the kind.
    pub fn next(self) -> Result<Self, ErrorKind> {
        match self {
            Number::Int(n) => n.checked_add(1).map(Number::Int).ok_or(ErrorKind::Overflow),
            Number::Float(n) => Ok(Number::Float(n + 1.0)),
        }
    }

    /// `(a * b) / 2`, always a float.
    pub fn half_product(a: Self, b: Self) -> Self {
        let product = match (a, b) {
            (Number::Int(a), Number::Int(b)) => (a as i128 * b as i128) as f64,
            (a, b) => a.as_f64() * b.as_f64(),
        };

        Number::Float(product / 2.0)
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{n}"),
            Number::Float(n) => f.write_str(&format_float(*n)),
        }
    }
}

/// Shortest round-trip text with at least one fractional digit.
///
/// Magnitudes of `1e16` and above, or below `1e-4`, use exponent form with a
/// signed two-digit exponent: `1e+16`, `1.5e-05`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::from("nan");
    }
    if value.is_infinite() {
        return String::from(if value > 0.0 { "inf" } else { "-inf" });
    }

    let abs = value.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or_default();
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
            }
            None => text,
        };
    }

    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
