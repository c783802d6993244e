//! Decoding of the four hexadecimal digits of a `\u` escape.
//!
//! [`UnicodeEscape`] accumulates exactly four ASCII hex digits into a UTF-16
//! code unit. Pairing surrogates is left to the string reader, which needs to
//! look at the following escape before it can produce a `char`.

use crate::error::LexicalError;

#[derive(Debug, Default)]
pub(crate) struct UnicodeEscape {
    acc: u32,
    len: u8,
}

pub(crate) const HIGH_SURROGATES: core::ops::RangeInclusive<u32> = 0xD800..=0xDBFF;
pub(crate) const LOW_SURROGATES: core::ops::RangeInclusive<u32> = 0xDC00..=0xDFFF;

impl UnicodeEscape {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds one digit. Returns the code unit once the fourth digit arrives
    /// and resets for the next escape.
    pub(crate) fn feed(&mut self, c: char) -> Result<Option<u32>, LexicalError> {
        let d = c.to_digit(16).ok_or(LexicalError::InvalidUnicodeEscapeChar(c))?;
        self.acc = (self.acc << 4) | d;
        self.len += 1;
        if self.len < 4 {
            return Ok(None);
        }
        let unit = self.acc;
        *self = Self::default();
        Ok(Some(unit))
    }
}

/// Combines a high and a low surrogate into the scalar they encode.
pub(crate) fn combine_surrogates(high: u32, low: u32) -> Option<char> {
    if !HIGH_SURROGATES.contains(&high) || !LOW_SURROGATES.contains(&low) {
        return None;
    }
    char::from_u32(0x1_0000 + ((high - 0xD800) << 10) + (low - 0xDC00))
}
