//! JSON numbers that remember whether they were written as integers.
//!
//! The lexer decides between integral and floating representations by the
//! characters it saw (`42` versus `42.0` or `4.2e1`), never by inspecting the
//! value, and the writer preserves that distinction on the way out.
use core::{fmt, str::FromStr};

/// A JSON number.
///
/// # Examples
///
/// ```
/// use jsonwire::Number;
///
/// let n: Number = "42".parse().unwrap();
/// assert!(n.is_integral());
/// assert_eq!(n.as_i64(), Some(42));
///
/// let f: Number = "42.0".parse().unwrap();
/// assert!(f.is_f64());
/// assert_eq!(f.to_string(), "42.0");
/// ```
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(transparent))]
pub struct Number {
    n: N,
}

#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(any(test, feature = "serde"), derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(any(test, feature = "serde"), serde(untagged))]
enum N {
    PosInt(u64),
    /// Always less than zero.
    NegInt(i64),
    Float(f64),
}

/// Characters the lexer accumulates into a number literal.
pub(crate) fn is_number_char(c: char) -> bool {
    matches!(c, '0'..='9' | '+' | '-' | '.' | 'e' | 'E')
}

/// Whether `lexeme` matches `-? (0 | [1-9][0-9]*) (.[0-9]+)? ([eE][+-]?[0-9]+)?`.
fn is_json_number(lexeme: &str) -> bool {
    let mut rest = lexeme.strip_prefix('-').unwrap_or(lexeme).as_bytes();
    rest = match rest {
        [b'0', tail @ ..] => tail,
        [b'1'..=b'9', ..] => skip_digits(rest),
        _ => return false,
    };
    if let [b'.', tail @ ..] = rest {
        rest = skip_digits(tail);
        if rest.len() == tail.len() {
            return false;
        }
    }
    if let [b'e' | b'E', tail @ ..] = rest {
        let tail = match tail {
            [b'+' | b'-', signed @ ..] => signed,
            _ => tail,
        };
        rest = skip_digits(tail);
        if rest.len() == tail.len() {
            return false;
        }
    }
    rest.is_empty()
}

fn skip_digits(bytes: &[u8]) -> &[u8] {
    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    &bytes[digits..]
}

impl Number {
    /// Builds a floating number, rejecting NaN and infinities.
    #[must_use]
    pub fn from_f64(f: f64) -> Option<Self> {
        f.is_finite().then_some(Self { n: N::Float(f) })
    }

    /// Whether the number was written without a decimal point or exponent.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        !self.is_f64()
    }

    #[must_use]
    pub fn is_f64(&self) -> bool {
        matches!(self.n, N::Float(_))
    }

    /// The value as an `i64`, if it is integral and in range.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self.n {
            N::PosInt(u) => i64::try_from(u).ok(),
            N::NegInt(i) => Some(i),
            N::Float(_) => None,
        }
    }

    /// The value as a `u64`, if it is integral and not negative.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self.n {
            N::PosInt(u) => Some(u),
            N::NegInt(_) | N::Float(_) => None,
        }
    }

    /// The value as an `f64`; large integers may lose precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match self.n {
            N::PosInt(u) => u as f64,
            N::NegInt(i) => i as f64,
            N::Float(f) => f,
        }
    }

    /// The exact integer this number denotes, including floats without a
    /// fractional part.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn to_i128(self) -> Option<i128> {
        match self.n {
            N::PosInt(u) => Some(i128::from(u)),
            N::NegInt(i) => Some(i128::from(i)),
            N::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.7e38 => Some(f as i128),
            N::Float(_) => None,
        }
    }

    /// Parses a lexeme produced by the number lexer. Only the RFC 8259
    /// number grammar is accepted. A decimal point or an exponent makes the
    /// number floating; integers that overflow 64 bits fall back to
    /// floating.
    pub(crate) fn from_lexeme(lexeme: &str) -> Option<Self> {
        if !is_json_number(lexeme) {
            return None;
        }
        if !lexeme.contains(['.', 'e', 'E']) {
            if let Ok(i) = lexeme.parse::<i64>() {
                return Some(Self::from(i));
            }
            if let Ok(u) = lexeme.parse::<u64>() {
                return Some(Self::from(u));
            }
        }
        lexeme.parse::<f64>().ok().and_then(Self::from_f64)
    }
}

/// Error returned when a string is not a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a number")]
pub struct ParseNumberError(String);

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lexeme(s).ok_or_else(|| ParseNumberError(s.to_owned()))
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(i: $t) -> Self {
                let i = i as i64;
                if i < 0 {
                    Self { n: N::NegInt(i) }
                } else {
                    Self { n: N::PosInt(i.unsigned_abs()) }
                }
            }
        }
    )*};
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for Number {
            fn from(u: $t) -> Self {
                Self { n: N::PosInt(u as u64) }
            }
        }
    )*};
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Number {
    fn from(f: f32) -> Self {
        Self {
            n: N::Float(f64::from(f)),
        }
    }
}

impl From<f64> for Number {
    /// Non-finite values are kept as-is; the writer emits them as `null`.
    fn from(f: f64) -> Self {
        Self { n: N::Float(f) }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.n {
            N::PosInt(u) => write!(f, "{u}"),
            N::NegInt(i) => write!(f, "{i}"),
            // `Debug` is the shortest representation that round-trips and
            // always carries a `.0` or an exponent.
            N::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number({self})")
    }
}
