//! Byte-level reading and writing for the CBOR binary format.
//!
//! Implements the sources the decoder reads from (borrowed slices and
//! `io::Read` streams) and the header-writing primitives of the encoder.

use std::io::{self, Read, Write};

use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_READ_CHUNK;

// =============================================================================
// DECODING
// =============================================================================

/// Input the decoder pulls bytes from.
pub trait ByteSource {
    /// Reads a single byte.
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError>;

    /// Returns the next byte without consuming it, or `None` at the end.
    fn peek_byte(&mut self) -> Result<Option<u8>, DecodeError>;

    /// Appends exactly `len` bytes to `out`.
    ///
    /// Implementations must not allocate more than the input can provide,
    /// whatever `len` claims.
    fn read_into(
        &mut self,
        len: u64,
        out: &mut Vec<u8>,
        context: &'static str,
    ) -> Result<(), DecodeError>;

    /// Number of bytes consumed so far.
    fn position(&self) -> usize;

    /// Reads exactly `N` bytes.
    fn read_array<const N: usize>(
        &mut self,
        context: &'static str,
    ) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        for slot in out.iter_mut() {
            *slot = self.read_byte(context)?;
        }
        Ok(out)
    }
}

/// Reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Reads exactly n bytes without copying.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}

impl ByteSource for Reader<'_> {
    #[inline]
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(byte)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        Ok(self.data.get(self.pos).copied())
    }

    fn read_into(
        &mut self,
        len: u64,
        out: &mut Vec<u8>,
        context: &'static str,
    ) -> Result<(), DecodeError> {
        let len = usize::try_from(len).map_err(|_| DecodeError::UnexpectedEof { context })?;
        out.extend_from_slice(self.read_bytes(len, context)?);
        Ok(())
    }

    fn position(&self) -> usize {
        self.pos
    }
}

/// Reader over an `io::Read` stream with one byte of lookahead.
///
/// Long declared lengths are read in chunks of at most
/// [`MAX_READ_CHUNK`] bytes, so a bogus length fails at end of input
/// instead of allocating up front.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    peeked: Option<u8>,
    pos: usize,
}

fn eof_or_io(err: io::Error, context: &'static str) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        DecodeError::UnexpectedEof { context }
    } else {
        DecodeError::from(err)
    }
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            pos: 0,
        }
    }

    /// Returns the underlying stream. A peeked byte is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for StreamReader<R> {
    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = match self.peeked.take() {
            Some(byte) => byte,
            None => {
                let mut buf = [0u8; 1];
                self.inner
                    .read_exact(&mut buf)
                    .map_err(|err| eof_or_io(err, context))?;
                buf[0]
            }
        };
        self.pos += 1;
        Ok(byte)
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        if self.peeked.is_none() {
            let mut buf = [0u8; 1];
            match self.inner.read_exact(&mut buf) {
                Ok(()) => self.peeked = Some(buf[0]),
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(self.peeked)
    }

    fn read_into(
        &mut self,
        len: u64,
        out: &mut Vec<u8>,
        context: &'static str,
    ) -> Result<(), DecodeError> {
        let mut remaining = len;
        if remaining > 0 {
            if let Some(byte) = self.peeked.take() {
                out.push(byte);
                self.pos += 1;
                remaining -= 1;
            }
        }
        while remaining > 0 {
            let chunk = remaining.min(MAX_READ_CHUNK as u64);
            let before = out.len();
            (&mut self.inner).take(chunk).read_to_end(out)?;
            let got = (out.len() - before) as u64;
            self.pos += got as usize;
            if got < chunk {
                return Err(DecodeError::UnexpectedEof { context });
            }
            remaining -= chunk;
        }
        Ok(())
    }

    fn position(&self) -> usize {
        self.pos
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Writer for encoding binary data into any `io::Write`.
#[derive(Debug, Clone, Default)]
pub struct Writer<W> {
    inner: W,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<(), EncodeError> {
        self.inner.write_all(&[byte])?;
        Ok(())
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Writes a major type and argument in the shortest form.
    pub fn write_header(&mut self, major: u8, value: u64) -> Result<(), EncodeError> {
        // Stack buffer: initial byte plus up to 8 argument bytes
        let mut buf = [0u8; 9];
        let initial = major << 5;
        let len = if value < 24 {
            buf[0] = initial | value as u8;
            1
        } else if value <= u64::from(u8::MAX) {
            buf[0] = initial | 24;
            buf[1] = value as u8;
            2
        } else if value <= u64::from(u16::MAX) {
            buf[0] = initial | 25;
            buf[1..3].copy_from_slice(&(value as u16).to_be_bytes());
            3
        } else if value <= u64::from(u32::MAX) {
            buf[0] = initial | 26;
            buf[1..5].copy_from_slice(&(value as u32).to_be_bytes());
            5
        } else {
            buf[0] = initial | 27;
            buf[1..9].copy_from_slice(&value.to_be_bytes());
            9
        };
        self.write_bytes(&buf[..len])
    }

    pub fn write_f32(&mut self, value: f32) -> Result<(), EncodeError> {
        self.write_byte(0xfa)?;
        self.write_bytes(&value.to_be_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), EncodeError> {
        self.write_byte(0xfb)?;
        self.write_bytes(&value.to_be_bytes())
    }
}
