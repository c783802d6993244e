//! Character sources the lookahead buffer pulls from.
use std::io::{self, Read};

/// Something that yields characters one at a time.
///
/// `Ok(None)` marks the end of the source; implementations are not required
/// to keep returning `None` afterwards, the lookahead buffer remembers it.
pub trait CharSource {
    /// Produces the next character.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying source fails or holds invalid
    /// text.
    fn next_char(&mut self) -> io::Result<Option<char>>;
}

impl CharSource for core::str::Chars<'_> {
    fn next_char(&mut self) -> io::Result<Option<char>> {
        Ok(self.next())
    }
}

/// Decodes UTF-8 incrementally from any [`Read`].
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    eof: bool,
}

const READ_CHUNK: usize = 8 * 1024;
/// Longest UTF-8 encoding of a single scalar value.
const MAX_UTF8_LEN: usize = 4;

impl<R: Read> ReadSource<R> {
    /// Wraps `reader`. No bytes are read until the first character is
    /// requested.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0; READ_CHUNK].into_boxed_slice(),
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// Tops the buffer up so at least one complete character is available
    /// unless the reader is exhausted.
    fn fill(&mut self) -> io::Result<()> {
        if self.eof || self.end - self.start >= MAX_UTF8_LEN {
            return Ok(());
        }
        self.buf.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
        while !self.eof && self.end < MAX_UTF8_LEN {
            match self.reader.read(&mut self.buf[self.end..]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<R: Read> CharSource for ReadSource<R> {
    fn next_char(&mut self) -> io::Result<Option<char>> {
        self.fill()?;
        let pending = &self.buf[self.start..self.end];
        if pending.is_empty() {
            return Ok(None);
        }
        match bstr::decode_utf8(pending) {
            (Some(c), len) => {
                self.start += len;
                Ok(Some(c))
            }
            (None, _) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "stream did not contain valid UTF-8",
            )),
        }
    }
}
