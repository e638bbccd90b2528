//! Recursive-descent JSON parser (RFC 7159) producing [`Value`]s.

use log::debug;

use crate::error::DecodeError;
use crate::json::source::CodePointSource;
use crate::limits::{MAX_NESTING_DEPTH, STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::model::{Array, Map, Value};
use crate::number::parse_number_literal;

/// Options for JSON parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// Reject objects that repeat a key. Otherwise the last value wins.
    pub no_duplicates: bool,
    /// Require the top-level value to be an array or an object.
    pub container_only: bool,
    /// Maximum nesting of arrays and objects.
    pub max_depth: usize,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            no_duplicates: false,
            container_only: false,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects duplicate keys and scalar documents.
    pub fn strict() -> Self {
        Self {
            no_duplicates: true,
            container_only: true,
            ..Self::default()
        }
    }
}

pub(crate) struct Parser<S> {
    source: S,
    peeked: Option<char>,
    /// Code points consumed so far.
    offset: usize,
    depth: usize,
    options: JsonOptions,
}

impl<S: CodePointSource> Parser<S> {
    pub(crate) fn new(source: S, options: JsonOptions) -> Self {
        Self {
            source,
            peeked: None,
            offset: 0,
            depth: 0,
            options,
        }
    }

    fn error_at(offset: usize, message: &'static str) -> DecodeError {
        DecodeError::Json { offset, message }
    }

    fn error(&self, message: &'static str) -> DecodeError {
        Self::error_at(self.offset, message)
    }

    fn peek(&mut self) -> Result<Option<char>, DecodeError> {
        if self.peeked.is_none() {
            self.peeked = self.source.next_code_point()?;
        }
        Ok(self.peeked)
    }

    fn bump(&mut self) -> Result<Option<char>, DecodeError> {
        let c = match self.peeked.take() {
            Some(c) => Some(c),
            None => self.source.next_code_point()?,
        };
        if c.is_some() {
            self.offset += 1;
        }
        Ok(c)
    }

    fn expect(&mut self, expected: char, message: &'static str) -> Result<(), DecodeError> {
        match self.peek()? {
            Some(c) if c == expected => {
                self.bump()?;
                Ok(())
            }
            _ => Err(self.error(message)),
        }
    }

    fn skip_whitespace(&mut self) -> Result<(), DecodeError> {
        while let Some(' ' | '\t' | '\n' | '\r') = self.peek()? {
            self.bump()?;
        }
        Ok(())
    }

    /// Skips a leading byte order mark.
    pub(crate) fn skip_bom(&mut self) -> Result<(), DecodeError> {
        if self.peek()? == Some('\u{feff}') {
            self.bump()?;
        }
        Ok(())
    }

    /// Parses one complete document.
    pub(crate) fn parse_document(&mut self) -> Result<Value, DecodeError> {
        self.skip_whitespace()?;
        match self.peek()? {
            None => return Err(self.error("unexpected end of input")),
            Some('[' | '{') => {}
            Some(_) if self.options.container_only => {
                return Err(self.error("expected an array or object"));
            }
            Some(_) => {}
        }
        let value = self.parse_value()?;
        self.skip_whitespace()?;
        if self.peek()?.is_some() {
            return Err(self.error("trailing characters after JSON value"));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> Result<Value, DecodeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || self.parse_value_inner())
    }

    fn parse_value_inner(&mut self) -> Result<Value, DecodeError> {
        match self.peek()? {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') => Ok(Value::TextString(self.parse_string()?)),
            Some('t') => self.parse_literal("true", Value::TRUE),
            Some('f') => self.parse_literal("false", Value::FALSE),
            Some('n') => self.parse_literal("null", Value::NULL),
            Some('-' | '0'..='9') => self.parse_number(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_literal(&mut self, word: &'static str, value: Value) -> Result<Value, DecodeError> {
        let start = self.offset;
        for expected in word.chars() {
            if self.bump()? != Some(expected) {
                return Err(Self::error_at(start, "invalid literal"));
            }
        }
        Ok(value)
    }

    fn parse_number(&mut self) -> Result<Value, DecodeError> {
        let start = self.offset;
        let mut text = String::new();
        while let Some(c @ ('0'..='9' | '-' | '+' | '.' | 'e' | 'E')) = self.peek()? {
            text.push(c);
            self.bump()?;
        }
        parse_number_literal(&text).ok_or_else(|| Self::error_at(start, "invalid number"))
    }

    fn read_hex4(&mut self) -> Result<u16, DecodeError> {
        let mut unit = 0u16;
        for _ in 0..4 {
            let digit = self
                .bump()?
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid \\u escape"))?;
            unit = (unit << 4) | digit as u16;
        }
        Ok(unit)
    }

    /// Reads the code point of a `\u` escape whose backslash is at `start`.
    fn parse_unicode_escape(&mut self, start: usize) -> Result<char, DecodeError> {
        let unit = self.read_hex4()?;
        let code = match unit {
            0xd800..=0xdbff => {
                if self.bump()? != Some('\\') || self.bump()? != Some('u') {
                    return Err(DecodeError::UnpairedSurrogate { offset: start });
                }
                let low = self.read_hex4()?;
                if !(0xdc00..=0xdfff).contains(&low) {
                    return Err(DecodeError::UnpairedSurrogate { offset: start });
                }
                0x10000 + ((u32::from(unit) & 0x3ff) << 10) + (u32::from(low) & 0x3ff)
            }
            0xdc00..=0xdfff => return Err(DecodeError::UnpairedSurrogate { offset: start }),
            _ => u32::from(unit),
        };
        char::from_u32(code).ok_or(DecodeError::UnpairedSurrogate { offset: start })
    }

    fn parse_string(&mut self) -> Result<String, DecodeError> {
        self.expect('"', "expected string")?;
        let mut out = String::new();
        loop {
            let at = self.offset;
            match self.bump()? {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => {
                    let c = match self.bump()? {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{08}',
                        Some('f') => '\u{0c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.parse_unicode_escape(at)?,
                        _ => return Err(Self::error_at(at, "invalid escape sequence")),
                    };
                    out.push(c);
                }
                Some(c) if (c as u32) < 0x20 => {
                    return Err(Self::error_at(at, "control character in string"));
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            debug!("JSON parse aborted at offset {}: nesting too deep", self.offset);
            return Err(DecodeError::NestingTooDeep {
                max: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn parse_array(&mut self) -> Result<Value, DecodeError> {
        self.expect('[', "expected '['")?;
        self.enter()?;
        let array = Array::new();
        self.skip_whitespace()?;
        if self.peek()? == Some(']') {
            self.bump()?;
        } else {
            loop {
                self.skip_whitespace()?;
                let item = self.parse_value()?;
                array.borrow_mut().push(item);
                self.skip_whitespace()?;
                match self.bump()? {
                    Some(',') => continue,
                    Some(']') => break,
                    _ => {
                        let at = self.offset.saturating_sub(1);
                        return Err(Self::error_at(at, "expected ',' or ']'"));
                    }
                }
            }
        }
        self.depth -= 1;
        Ok(Value::Array(array))
    }

    fn parse_object(&mut self) -> Result<Value, DecodeError> {
        self.expect('{', "expected '{'")?;
        self.enter()?;
        let map = Map::new();
        self.skip_whitespace()?;
        if self.peek()? == Some('}') {
            self.bump()?;
        } else {
            loop {
                self.skip_whitespace()?;
                let key_offset = self.offset;
                if self.peek()? != Some('"') {
                    return Err(self.error("expected string key"));
                }
                let key = Value::TextString(self.parse_string()?);
                self.skip_whitespace()?;
                self.expect(':', "expected ':'")?;
                self.skip_whitespace()?;
                let value = self.parse_value()?;
                if self.options.no_duplicates && map.contains_key(&key) {
                    return Err(Self::error_at(key_offset, "duplicate key"));
                }
                map.insert(key, value);
                self.skip_whitespace()?;
                match self.bump()? {
                    Some(',') => continue,
                    Some('}') => break,
                    _ => {
                        let at = self.offset.saturating_sub(1);
                        return Err(Self::error_at(at, "expected ',' or '}'"));
                    }
                }
            }
        }
        self.depth -= 1;
        Ok(Value::Map(map))
    }
}
