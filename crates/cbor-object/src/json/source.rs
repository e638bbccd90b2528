//! Code point sources for the JSON parser.

use std::io::{self, BufRead, BufReader, Read};
use std::str::Chars;

use crate::error::DecodeError;

/// Sequence of Unicode scalar values the parser reads from.
pub trait CodePointSource {
    /// Returns the next code point, or `None` at the end of input.
    ///
    /// Decoding errors carry the offset (in code points) of the bad input.
    fn next_code_point(&mut self) -> Result<Option<char>, DecodeError>;
}

/// Source over already-decoded text.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { chars: text.chars() }
    }
}

impl CodePointSource for StrSource<'_> {
    #[inline]
    fn next_code_point(&mut self) -> Result<Option<char>, DecodeError> {
        Ok(self.chars.next())
    }
}

/// Strict incremental UTF-8 decoder over a byte stream.
///
/// Overlong forms, encoded surrogates, code points past U+10FFFF and
/// truncated sequences are errors.
#[derive(Debug)]
pub struct Utf8Source<R> {
    inner: BufReader<R>,
    offset: usize,
}

impl<R: Read> Utf8Source<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            offset: 0,
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        let byte = loop {
            match self.inner.fill_buf() {
                Ok(buf) => break buf.first().copied(),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        if byte.is_some() {
            self.inner.consume(1);
        }
        Ok(byte)
    }

    fn invalid(&self) -> DecodeError {
        DecodeError::Json {
            offset: self.offset,
            message: "invalid UTF-8",
        }
    }
}

impl<R: Read> CodePointSource for Utf8Source<R> {
    fn next_code_point(&mut self) -> Result<Option<char>, DecodeError> {
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };
        let (len, min, mut code) = match lead {
            0x00..=0x7f => {
                self.offset += 1;
                return Ok(Some(char::from(lead)));
            }
            0xc2..=0xdf => (2, 0x80, u32::from(lead & 0x1f)),
            0xe0..=0xef => (3, 0x800, u32::from(lead & 0x0f)),
            0xf0..=0xf4 => (4, 0x10000, u32::from(lead & 0x07)),
            _ => return Err(self.invalid()),
        };
        for _ in 1..len {
            match self.next_byte()? {
                Some(byte) if byte & 0xc0 == 0x80 => code = (code << 6) | u32::from(byte & 0x3f),
                _ => return Err(self.invalid()),
            }
        }
        if code < min {
            return Err(self.invalid());
        }
        let c = char::from_u32(code).ok_or_else(|| self.invalid())?;
        self.offset += 1;
        Ok(Some(c))
    }
}
