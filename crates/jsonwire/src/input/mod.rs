//! The streaming pull parser.
//!
//! [`JsonInput`] hands out one token at a time. Callers [`peek`] at the kind
//! of the next token and then consume it with the matching `next_*` or
//! `begin_*`/`end_*` call; anything else is a structural error. Containers
//! are walked with [`has_next`]:
//!
//! ```
//! use jsonwire::{Json, TokenKind};
//!
//! let json = Json::new();
//! let mut input = json.new_input(r#"{"a": [1, 2], "b": true}"#);
//! input.begin_map()?;
//! let mut seen = Vec::new();
//! while input.has_next()? {
//!     let name = input.next_name()?;
//!     if input.peek()? == TokenKind::StartArray {
//!         input.skip_value()?;
//!     } else {
//!         assert!(input.next_bool()?);
//!     }
//!     seen.push(name);
//! }
//! input.end_map()?;
//! assert_eq!(seen, ["a", "b"]);
//! # Ok::<(), jsonwire::JsonError>(())
//! ```
//!
//! [`peek`]: JsonInput::peek
//! [`has_next`]: JsonInput::has_next
use core::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    Number, PropertySetting, TypeCoercer,
    coerce::Coercible,
    error::{JsonError, LexicalError, Location, Result},
    number::is_number_char,
};

mod escape;
mod literal;
pub(crate) mod lookahead;
mod source;

use escape::{HIGH_SURROGATES, LOW_SURROGATES, UnicodeEscape, combine_surrogates};
use literal::{ExpectedLiteral, Literal};
use lookahead::Input;
pub use source::{CharSource, ReadSource};

/// The kind of the next token, as reported by [`JsonInput::peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Boolean,
    Number,
    String,
    /// A string (or bare number) in the key position of a map.
    Name,
    Null,
    StartArray,
    EndArray,
    StartMap,
    EndMap,
    /// No more input.
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Name => "name",
            Self::Null => "null",
            Self::StartArray => "start of array",
            Self::EndArray => "end of array",
            Self::StartMap => "start of map",
            Self::EndMap => "end of map",
            Self::End => "end of input",
        })
    }
}

/// An open container on the parser's context stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Array,
    /// Inside a map, expecting a name or the closing brace.
    MapName,
    /// Inside a map, a name has been read and its value is next.
    MapValue,
}

/// Where the innermost container is between its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    /// Nothing read yet; a comma here is an error.
    Leading,
    /// [`JsonInput::has_next`] announced an element that has not been read.
    Announced,
    /// An element was read; a comma or the closing bracket comes next.
    Trailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    container: Container,
    separator: Separator,
}

impl Frame {
    fn new(container: Container) -> Self {
        Self {
            container,
            separator: Separator::Leading,
        }
    }
}

/// A pull parser over a character source.
///
/// Created through [`Json::new_input`](crate::Json::new_input) or
/// [`JsonInput::new`]. Typed reads go through the [`TypeCoercer`] the parser
/// was created with.
#[derive(Debug)]
pub struct JsonInput<'src> {
    input: Input<'src>,
    coercer: Arc<TypeCoercer>,
    setting: PropertySetting,
    max_nesting: usize,
    stack: Vec<Frame>,
}

impl<'src> JsonInput<'src> {
    /// How many arrays and maps may be open at once unless configured
    /// otherwise.
    pub const DEFAULT_MAX_NESTING: usize = 128;

    /// Creates a parser reading from `source`.
    pub fn new(source: impl CharSource + 'src, coercer: Arc<TypeCoercer>) -> Self {
        Self {
            input: Input::new(source),
            coercer,
            setting: PropertySetting::default(),
            max_nesting: Self::DEFAULT_MAX_NESTING,
            stack: Vec::new(),
        }
    }

    /// The kind of the next token. Skips whitespace but consumes nothing
    /// else, so it may be called repeatedly.
    ///
    /// # Errors
    ///
    /// A lexical error if the next character cannot start any token.
    pub fn peek(&mut self) -> Result<TokenKind> {
        self.skip_whitespace()?;
        let Some(c) = self.input.peek()? else {
            return Ok(TokenKind::End);
        };
        let in_name = self.top() == Some(Container::MapName);
        Ok(match c {
            '"' | '0'..='9' | '-' if in_name => TokenKind::Name,
            '"' => TokenKind::String,
            '0'..='9' | '-' => TokenKind::Number,
            't' | 'f' => TokenKind::Boolean,
            'n' => TokenKind::Null,
            '[' => TokenKind::StartArray,
            ']' => TokenKind::EndArray,
            '{' => TokenKind::StartMap,
            '}' => TokenKind::EndMap,
            c => return Err(self.lexical(LexicalError::InvalidCharacter(c))),
        })
    }

    /// Reads `true` or `false`.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not a boolean, a lexical one
    /// if the literal is malformed.
    pub fn next_bool(&mut self) -> Result<bool> {
        self.expect(TokenKind::Boolean)?;
        let literal = ExpectedLiteral::read(&mut self.input, "true or false")?;
        self.value_read();
        Ok(literal == Literal::True)
    }

    /// Reads `null`.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not `null`.
    pub fn next_null(&mut self) -> Result<()> {
        self.expect(TokenKind::Null)?;
        ExpectedLiteral::read(&mut self.input, "null")?;
        self.value_read();
        Ok(())
    }

    /// Reads a number, keeping whether it was written as an integer.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not a number, a lexical one if
    /// its digits do not form a finite number.
    pub fn next_number(&mut self) -> Result<Number> {
        self.expect(TokenKind::Number)?;
        let n = self.read_number_lexeme()?.1;
        self.value_read();
        Ok(n)
    }

    /// Reads a string value with its escapes resolved.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not a string, a lexical one
    /// for a bad escape or a missing closing quote.
    pub fn next_string(&mut self) -> Result<String> {
        self.expect(TokenKind::String)?;
        let s = self.read_quoted()?;
        self.value_read();
        Ok(s)
    }

    /// Reads a map key and the `:` after it. Bare numbers are accepted as
    /// keys and returned as written.
    ///
    /// # Errors
    ///
    /// A structural error outside a name position, a lexical one if the
    /// separator is missing.
    pub fn next_name(&mut self) -> Result<String> {
        self.expect(TokenKind::Name)?;
        let name = if self.input.peek()? == Some('"') {
            self.read_quoted()?
        } else {
            self.read_number_lexeme()?.0
        };
        self.skip_whitespace()?;
        match self.input.read()? {
            Some(':') => {}
            Some(c) => return Err(self.lexical(LexicalError::InvalidCharacter(c))),
            None => return Err(self.lexical(LexicalError::UnexpectedEndOfInput)),
        }
        if let Some(top) = self.stack.last_mut() {
            top.container = Container::MapValue;
        }
        Ok(name)
    }

    /// Reads a point in time, written either as milliseconds since the Unix
    /// epoch or as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// A structural error for any other token, or for a value that does not
    /// denote a representable instant.
    pub fn next_instant(&mut self) -> Result<DateTime<Utc>> {
        match self.peek()? {
            TokenKind::Number => {
                let n = self.next_number()?;
                n.as_i64()
                    .and_then(DateTime::from_timestamp_millis)
                    .ok_or_else(|| self.structural_error(format!("{n} is not a valid epoch timestamp")))
            }
            TokenKind::String => {
                let s = self.next_string()?;
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| self.structural_error(format!("'{s}' is not an RFC 3339 timestamp: {e}")))
            }
            other => Err(self.structural_error(format!("expected an instant but was {other}"))),
        }
    }

    /// Opens an array.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not `[` or the array would
    /// nest deeper than [`JsonInput::max_nesting`] allows.
    pub fn begin_array(&mut self) -> Result<()> {
        self.expect(TokenKind::StartArray)?;
        self.open(Container::Array)
    }

    /// Closes the innermost container, which must be an array.
    ///
    /// # Errors
    ///
    /// A structural error if the innermost container is a map or the next
    /// token is not `]`.
    pub fn end_array(&mut self) -> Result<()> {
        match self.top() {
            Some(Container::Array) => {}
            Some(_) => return Err(self.structural_error("attempt to close an array while inside a map")),
            None => return Err(self.structural_error("attempt to close an array that was never opened")),
        }
        self.expect(TokenKind::EndArray)?;
        self.input.read()?;
        self.stack.pop();
        self.value_read();
        Ok(())
    }

    /// Opens a map.
    ///
    /// # Errors
    ///
    /// A structural error if the next token is not `{` or the map would
    /// nest deeper than [`JsonInput::max_nesting`] allows.
    pub fn begin_map(&mut self) -> Result<()> {
        self.expect(TokenKind::StartMap)?;
        self.open(Container::MapName)
    }

    /// Closes the innermost container, which must be a map that is not
    /// waiting for a value.
    ///
    /// # Errors
    ///
    /// A structural error if the innermost container is an array, a name was
    /// read without its value, or the next token is not `}`.
    pub fn end_map(&mut self) -> Result<()> {
        match self.top() {
            Some(Container::MapName) => {}
            Some(Container::MapValue) => {
                return Err(self.structural_error("attempt to close a map while a value is expected"));
            }
            Some(Container::Array) => return Err(self.structural_error("attempt to close a map while inside an array")),
            None => return Err(self.structural_error("attempt to close a map that was never opened")),
        }
        self.expect(TokenKind::EndMap)?;
        self.input.read()?;
        self.stack.pop();
        self.value_read();
        Ok(())
    }

    /// Whether the innermost container has another element. Consumes the
    /// comma separating it from the previous one; asking again before the
    /// element is read gives the same answer.
    ///
    /// # Errors
    ///
    /// A structural error outside a container. A lexical one if the input
    /// ends before the container is closed, or for a comma before the first
    /// element, a missing comma between elements or a comma before the
    /// closing bracket.
    pub fn has_next(&mut self) -> Result<bool> {
        let Some(separator) = self.stack.last().map(|top| top.separator) else {
            return Err(self.structural_error("has_next is only valid inside an array or map"));
        };
        if separator == Separator::Announced {
            return Ok(true);
        }
        self.skip_whitespace()?;
        let comma = self.input.peek()? == Some(',');
        if comma {
            if separator == Separator::Leading {
                return Err(self.lexical(LexicalError::InvalidCharacter(',')));
            }
            self.input.read()?;
        }
        let kind = self.peek()?;
        let closing = matches!(kind, TokenKind::EndArray | TokenKind::EndMap);
        match kind {
            TokenKind::End => Err(self.lexical(LexicalError::UnexpectedEndOfInput)),
            _ if closing && !comma => Ok(false),
            // A comma right before the closing bracket, or two elements with
            // no comma between them.
            _ if closing || (separator == Separator::Trailing && !comma) => {
                let kind = self
                    .input
                    .peek()?
                    .map_or(LexicalError::UnexpectedEndOfInput, LexicalError::InvalidCharacter);
                Err(self.lexical(kind))
            }
            _ => {
                if let Some(top) = self.stack.last_mut() {
                    top.separator = Separator::Announced;
                }
                Ok(true)
            }
        }
    }

    /// Discards the next value, however deeply nested. At a name position
    /// the name and its value are both discarded.
    ///
    /// # Errors
    ///
    /// A structural error if there is no value to skip, plus whatever
    /// reading the value itself reports.
    pub fn skip_value(&mut self) -> Result<()> {
        match self.peek()? {
            TokenKind::Boolean => {
                self.next_bool()?;
            }
            TokenKind::Number => {
                self.next_number()?;
            }
            TokenKind::String => {
                self.next_string()?;
            }
            TokenKind::Null => self.next_null()?,
            TokenKind::Name => {
                self.next_name()?;
                self.skip_value()?;
            }
            TokenKind::StartArray => {
                self.begin_array()?;
                while self.has_next()? {
                    self.skip_value()?;
                }
                self.end_array()?;
            }
            TokenKind::StartMap => {
                self.begin_map()?;
                while self.has_next()? {
                    self.next_name()?;
                    self.skip_value()?;
                }
                self.end_map()?;
            }
            kind @ (TokenKind::End | TokenKind::EndArray | TokenKind::EndMap) => {
                return Err(self.structural_error(format!("there is no value to skip before {kind}")));
            }
        }
        Ok(())
    }

    /// Reads the next value as a `T` through the registry.
    ///
    /// Returns `Ok(None)` for an empty document and for a `null` read into
    /// a type without a null form.
    ///
    /// # Errors
    ///
    /// Any error the resolved reader reports, or a resolution error if `T`
    /// cannot be read.
    pub fn read<T: Coercible>(&mut self) -> Result<Option<T>> {
        if self.stack.is_empty() && self.peek()? == TokenKind::End {
            return Ok(None);
        }
        let coercer = Arc::clone(&self.coercer);
        coercer.read::<T>(self)
    }

    /// Reads a whole array of `T`. A `null` reads as an empty vector.
    ///
    /// # Errors
    ///
    /// As for [`JsonInput::read`].
    pub fn read_array<T: Coercible>(&mut self) -> Result<Vec<T>> {
        Ok(self.read::<Vec<T>>()?.unwrap_or_default())
    }

    /// Switches the property discovery mode for records read from here on,
    /// returning the previous mode.
    pub fn property_setting(&mut self, setting: PropertySetting) -> PropertySetting {
        core::mem::replace(&mut self.setting, setting)
    }

    /// The property discovery mode currently in effect.
    #[must_use]
    pub fn setting(&self) -> PropertySetting {
        self.setting
    }

    /// Limits how many arrays and maps may be open at once, returning the
    /// previous limit. Readers recurse once per level, so this bounds their
    /// stack use.
    pub fn set_max_nesting(&mut self, max_nesting: usize) -> usize {
        core::mem::replace(&mut self.max_nesting, max_nesting)
    }

    /// The nesting limit currently in effect.
    ///
    /// # Default
    ///
    /// [`JsonInput::DEFAULT_MAX_NESTING`]
    #[must_use]
    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    pub(crate) fn coercer(&self) -> &TypeCoercer {
        &self.coercer
    }

    /// Line, column and recently read text, for diagnostics.
    #[must_use]
    pub fn location(&self) -> Location {
        self.input.location()
    }

    /// Asserts that only whitespace remains.
    ///
    /// # Errors
    ///
    /// A structural error if a container is still open or anything but
    /// whitespace follows.
    pub fn consume_trailing_whitespace(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(self.structural_error("document ended while a container is open"));
        }
        self.skip_whitespace()?;
        match self.input.peek()? {
            None => Ok(()),
            Some(c) => Err(self.structural_error(format!("unexpected trailing data starting with '{c}'"))),
        }
    }

    /// Checks the next token, without consuming it.
    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        let actual = self.peek()?;
        if actual == kind {
            Ok(())
        } else {
            Err(self.structural_error(format!("expected {kind} but was {actual}")))
        }
    }

    fn top(&self) -> Option<Container> {
        self.stack.last().map(|top| top.container)
    }

    /// Consumes the opening bracket of a container and pushes its frame.
    fn open(&mut self, container: Container) -> Result<()> {
        if self.stack.len() >= self.max_nesting {
            return Err(self.structural_error(format!(
                "nesting exceeds the maximum of {} open arrays and maps",
                self.max_nesting
            )));
        }
        self.input.read()?;
        self.stack.push(Frame::new(container));
        Ok(())
    }

    /// Marks the current element of the innermost container as read. In a
    /// map that completes a name and value pair, so a name is expected next.
    fn value_read(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            match top.container {
                Container::MapValue => top.container = Container::MapName,
                Container::MapName => return,
                Container::Array => {}
            }
            top.separator = Separator::Trailing;
        }
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while self.input.peek()?.is_some_and(char::is_whitespace) {
            self.input.read()?;
        }
        Ok(())
    }

    fn read_number_lexeme(&mut self) -> Result<(String, Number)> {
        let mut lexeme = String::new();
        self.input.copy_while(&mut lexeme, is_number_char)?;
        match Number::from_lexeme(&lexeme) {
            Some(n) => Ok((lexeme, n)),
            None => Err(self.lexical(LexicalError::MalformedNumber(lexeme))),
        }
    }

    /// Reads a quoted string, starting at the opening quote.
    fn read_quoted(&mut self) -> Result<String> {
        self.input.read()?;
        let mut out = String::new();
        loop {
            self.input.copy_while(&mut out, |c| c != '"' && c != '\\' && !is_control(c))?;
            match self.input.peek()? {
                Some('"') => {
                    self.input.read()?;
                    return Ok(out);
                }
                Some('\\') => {
                    self.input.read()?;
                    let c = self.read_escape()?;
                    out.push(c);
                }
                Some(c) => return Err(self.lexical(LexicalError::InvalidCharacter(c))),
                None => return Err(self.lexical(LexicalError::UnterminatedString)),
            }
        }
    }

    fn read_escape(&mut self) -> Result<char> {
        let Some(c) = self.input.read()? else {
            return Err(self.lexical(LexicalError::UnterminatedString));
        };
        Ok(match c {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => return self.read_unicode_escape(),
            c => return Err(self.lexical(LexicalError::InvalidEscape(c))),
        })
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let unit = self.read_code_unit()?;
        if !HIGH_SURROGATES.contains(&unit) {
            return match char::from_u32(unit) {
                Some(c) if !LOW_SURROGATES.contains(&unit) => Ok(c),
                _ => Err(self.lexical(LexicalError::UnpairedSurrogate(unit))),
            };
        }
        if self.input.peek()? != Some('\\') {
            return Err(self.lexical(LexicalError::UnpairedSurrogate(unit)));
        }
        self.input.read()?;
        if self.input.read()? != Some('u') {
            return Err(self.lexical(LexicalError::UnpairedSurrogate(unit)));
        }
        let low = self.read_code_unit()?;
        combine_surrogates(unit, low).ok_or_else(|| self.lexical(LexicalError::UnpairedSurrogate(unit)))
    }

    fn read_code_unit(&mut self) -> Result<u32> {
        let mut escape = UnicodeEscape::new();
        loop {
            let Some(c) = self.input.read()? else {
                return Err(self.lexical(LexicalError::UnterminatedString));
            };
            match escape.feed(c) {
                Ok(Some(unit)) => return Ok(unit),
                Ok(None) => {}
                Err(kind) => return Err(self.lexical(kind)),
            }
        }
    }

    fn lexical(&self, kind: LexicalError) -> JsonError {
        JsonError::Lexical {
            kind,
            location: self.input.location(),
        }
    }

    pub(crate) fn structural_error(&self, message: impl Into<String>) -> JsonError {
        JsonError::Structural {
            message: message.into(),
            location: Some(self.input.location()),
        }
    }
}

/// Characters that must be escaped inside a string.
fn is_control(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{1f}')
}
