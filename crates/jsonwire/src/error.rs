use std::{fmt, io};

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = JsonError> = core::result::Result<T, E>;

/// Where in the input a problem was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Line of the next unread character, starting at 1.
    pub line: usize,
    /// Column of the next unread character, starting at 1.
    pub column: usize,
    /// The most recently read characters, oldest first.
    pub recent: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (last read: {:?})", self.line, self.column, self.recent)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexicalError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("invalid literal, expected `{expected}`")]
    InvalidLiteral { expected: &'static str },
    #[error("unterminated string")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("invalid unicode escape sequence at character: '{0}'")]
    InvalidUnicodeEscapeChar(char),
    #[error("unpaired surrogate in unicode escape \\u{0:04X}")]
    UnpairedSurrogate(u32),
    #[error("malformed number '{0}'")]
    MalformedNumber(String),
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}

/// Every failure the codec reports.
#[derive(Debug, Error)]
pub enum JsonError {
    /// Malformed JSON text.
    #[error("lexical error: {kind} at {location}")]
    Lexical {
        kind: LexicalError,
        location: Location,
    },
    /// Well-formed JSON used in the wrong place, or a writer protocol
    /// violation.
    #[error("structural error: {message}{}", at(.location))]
    Structural {
        message: String,
        location: Option<Location>,
    },
    /// No coercer could be resolved for a target type.
    #[error("unable to coerce {type_name}: {reason}")]
    Resolution { type_name: String, reason: String },
    /// Serialization nested deeper than allowed.
    #[error("reached the maximum depth of {max_depth} while writing JSON")]
    DepthLimit { max_depth: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn at(location: &Option<Location>) -> String {
    location
        .as_ref()
        .map(|location| format!(" at {location}"))
        .unwrap_or_default()
}

impl JsonError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural {
            message: message.into(),
            location: None,
        }
    }

    pub(crate) fn resolution(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// The input location attached to this error, if any.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Lexical { location, .. } => Some(location),
            Self::Structural { location, .. } => location.as_ref(),
            _ => None,
        }
    }
}
