use super::lookahead::Input;
use crate::{
    JsonError,
    error::{LexicalError, Result},
};

/// The keyword literals JSON allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Literal {
    Null,
    True,
    False,
}

/// What happened after feeding one more character into the matcher.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    NeedMore,
    Done(Literal),
    Reject,
}

/// Matches the remainder of a literal character by character.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExpectedLiteral {
    rest: &'static [u8],
    literal: Literal,
}

impl ExpectedLiteral {
    /// Starts matching after the first character (`n`, `t` or `f`).
    pub(crate) fn new(first: char) -> Option<Self> {
        let (rest, literal): (&'static [u8], _) = match first {
            'n' => (b"ull", Literal::Null),
            't' => (b"rue", Literal::True),
            'f' => (b"alse", Literal::False),
            _ => return None,
        };
        Some(Self { rest, literal })
    }

    pub(crate) fn step(&mut self, c: char) -> Step {
        match self.rest.split_first() {
            Some((&b, rest)) if char::from(b) == c => {
                self.rest = rest;
                if rest.is_empty() {
                    Step::Done(self.literal)
                } else {
                    Step::NeedMore
                }
            }
            _ => Step::Reject,
        }
    }

    /// Consumes a whole literal from `input`. The literal must not run into
    /// further alphanumeric characters, so `nullx` and `true1` are rejected.
    pub(crate) fn read(input: &mut Input<'_>, expected: &'static str) -> Result<Literal> {
        let invalid = |input: &Input<'_>| JsonError::Lexical {
            kind: LexicalError::InvalidLiteral { expected },
            location: input.location(),
        };
        let first = input.read()?.ok_or_else(|| invalid(input))?;
        let mut matcher = Self::new(first).ok_or_else(|| invalid(input))?;
        let literal = loop {
            let c = input.read()?.ok_or_else(|| invalid(input))?;
            match matcher.step(c) {
                Step::NeedMore => {}
                Step::Done(literal) => break literal,
                Step::Reject => return Err(invalid(input)),
            }
        };
        if input.peek()?.is_some_and(char::is_alphanumeric) {
            return Err(invalid(input));
        }
        Ok(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_through_each_literal() {
        for (text, literal) in [("null", Literal::Null), ("true", Literal::True), ("false", Literal::False)] {
            let mut chars = text.chars();
            let mut m = ExpectedLiteral::new(chars.next().unwrap()).unwrap();
            let steps: Vec<_> = chars.map(|c| m.step(c)).collect();
            assert_eq!(steps.last(), Some(&Step::Done(literal)));
            assert!(steps[..steps.len() - 1].iter().all(|s| *s == Step::NeedMore));
        }
    }

    #[test]
    fn mismatch_rejects() {
        let mut m = ExpectedLiteral::new('t').unwrap();
        assert_eq!(m.step('r'), Step::NeedMore);
        assert_eq!(m.step('x'), Step::Reject);
        assert!(ExpectedLiteral::new('x').is_none());
    }

    #[test]
    fn reads_from_input() {
        let mut input = Input::new("false]".chars());
        assert_eq!(ExpectedLiteral::read(&mut input, "false").unwrap(), Literal::False);
        assert_eq!(input.peek().unwrap(), Some(']'));

        for bad in ["nul", "nullx", "tru e"] {
            let mut input = Input::new(bad.chars());
            let err = ExpectedLiteral::read(&mut input, "null or true").unwrap_err();
            assert!(matches!(
                err,
                JsonError::Lexical { kind: LexicalError::InvalidLiteral { .. }, .. }
            ));
        }
    }
}
