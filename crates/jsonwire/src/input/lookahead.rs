use std::{collections::VecDeque, fmt};

use super::source::CharSource;
use crate::error::{Location, Result};

/// How many consumed characters are kept for diagnostics.
pub(crate) const HISTORY: usize = 128;

/// One character of lookahead over a [`CharSource`], with position tracking
/// and a bounded history of what was consumed.
pub(crate) struct Input<'src> {
    source: Box<dyn CharSource + 'src>,
    lookahead: Option<char>,
    /// Set once the source reported its end; never cleared.
    eof: bool,
    history: VecDeque<char>,
    line: usize,
    column: usize,
}

impl<'src> Input<'src> {
    pub(crate) fn new(source: impl CharSource + 'src) -> Self {
        Self {
            source: Box::new(source),
            lookahead: None,
            eof: false,
            history: VecDeque::with_capacity(HISTORY),
            line: 1,
            column: 1,
        }
    }

    /// The next character without consuming it. `None` at the end of input.
    pub(crate) fn peek(&mut self) -> Result<Option<char>> {
        if self.lookahead.is_none() && !self.eof {
            self.lookahead = self.source.next_char()?;
            self.eof = self.lookahead.is_none();
        }
        Ok(self.lookahead)
    }

    /// Consumes one character.
    pub(crate) fn read(&mut self) -> Result<Option<char>> {
        let c = self.peek()?;
        if let Some(c) = c {
            self.lookahead = None;
            if self.history.len() == HISTORY {
                self.history.pop_front();
            }
            self.history.push_back(c);
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(c)
    }

    /// Consumes characters while `predicate` holds, appending them to `dst`.
    pub(crate) fn copy_while<F>(&mut self, dst: &mut String, mut predicate: F) -> Result<usize>
    where
        F: FnMut(char) -> bool,
    {
        let mut copied = 0;
        while let Some(c) = self.peek()? {
            if !predicate(c) {
                break;
            }
            self.read()?;
            dst.push(c);
            copied += 1;
        }
        Ok(copied)
    }

    pub(crate) fn location(&self) -> Location {
        Location {
            line: self.line,
            column: self.column,
            recent: self.to_string(),
        }
    }
}

impl fmt::Display for Input<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.history.iter().try_for_each(|c| fmt::Write::write_char(f, *c))
    }
}

impl fmt::Debug for Input<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("lookahead", &self.lookahead)
            .field("eof", &self.eof)
            .field("line", &self.line)
            .field("column", &self.column)
            .field("recent", &self.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::JsonError;

    #[test]
    fn peek_does_not_advance() {
        let mut input = Input::new("ab".chars());
        assert_eq!(input.peek().unwrap(), Some('a'));
        assert_eq!(input.peek().unwrap(), Some('a'));
        assert_eq!(input.read().unwrap(), Some('a'));
        assert_eq!(input.peek().unwrap(), Some('b'));
        assert_eq!(input.read().unwrap(), Some('b'));
        assert_eq!(input.read().unwrap(), None);
        assert_eq!(input.peek().unwrap(), None);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let mut input = Input::new("{\n  \"a\"".chars());
        for _ in 0..4 {
            input.read().unwrap();
        }
        let location = input.location();
        assert_eq!((location.line, location.column), (2, 3));
        assert_eq!(location.recent, "{\n  ");
    }

    #[test]
    fn history_is_bounded() {
        let text: String = ('a'..='z').cycle().take(HISTORY * 2).collect();
        let mut input = Input::new(text.chars());
        while input.read().unwrap().is_some() {}
        let shown = input.to_string();
        assert_eq!(shown.chars().count(), HISTORY);
        assert!(text.ends_with(&shown));
    }

    struct Failing;

    impl CharSource for Failing {
        fn next_char(&mut self) -> io::Result<Option<char>> {
            Err(io::Error::other("boom"))
        }
    }

    #[test]
    fn source_failures_surface_as_io_errors() {
        let mut input = Input::new(Failing);
        assert!(matches!(input.peek(), Err(JsonError::Io(_))));
    }

    /// Yields one character, then ends, then would yield again.
    struct Flaky(u8);

    impl CharSource for Flaky {
        fn next_char(&mut self) -> io::Result<Option<char>> {
            self.0 += 1;
            Ok((self.0 != 2).then_some('x'))
        }
    }

    #[test]
    fn end_of_input_is_sticky() {
        let mut input = Input::new(Flaky(0));
        assert_eq!(input.read().unwrap(), Some('x'));
        assert_eq!(input.read().unwrap(), None);
        assert_eq!(input.read().unwrap(), None);
    }
}
