//! Error types for CBOR and JSON encoding/decoding and value access.

use std::borrow::Cow;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::model::ItemKind;

/// Error during binary decoding, JSON parsing or tag validation.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    // === Framing ===
    #[error("data is empty")]
    Empty,

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("expected data to be {expected} bytes long, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{remaining} trailing bytes after the top-level item at offset {position}")]
    TrailingBytes { position: usize, remaining: usize },

    // === Header grammar ===
    #[error("invalid initial byte 0x{byte:02x}")]
    InvalidHeader { byte: u8 },

    #[error("unexpected break code")]
    UnexpectedBreak,

    #[error("invalid chunk in indefinite-length {context}")]
    InvalidChunk { context: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: u64,
        max: u64,
    },

    #[error("invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    #[error("simple value {value} must not use the two-byte form")]
    InvalidSimpleValue { value: u8 },

    #[error("nesting depth exceeds maximum {max}")]
    NestingTooDeep { max: usize },

    #[error("duplicate map key at offset {position}")]
    DuplicateKey { position: usize },

    #[error("map key at offset {position} refers to a container that is still being decoded")]
    CyclicKey { position: usize },

    // === Tags ===
    #[error("tag {tag} payload rejected: {message}")]
    TagFilter { tag: u64, message: Cow<'static, str> },

    #[error("tag {tag}: {message}")]
    InvalidTag { tag: u64, message: Cow<'static, str> },

    // === References ===
    #[error("stringref used outside a stringref namespace")]
    NoStringRefNamespace,

    #[error("stringref index {index} out of range (table size: {size})")]
    StringRefOutOfRange { index: u64, size: usize },

    #[error("sharedref index {index} out of range (table size: {size})")]
    SharedRefOutOfRange { index: u64, size: usize },

    #[error("sharedref {index} refers to a value that is still being decoded")]
    IncompleteSharedRef { index: u64 },

    // === JSON ===
    #[error("JSON syntax error at offset {offset}: {message}")]
    Json { offset: usize, message: &'static str },

    #[error("unpaired surrogate at offset {offset}")]
    UnpairedSurrogate { offset: usize },

    // === I/O ===
    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl DecodeError {
    /// Builds a validator rejection for `tag`.
    pub fn invalid_tag(tag: u64, message: impl Into<Cow<'static, str>>) -> Self {
        DecodeError::InvalidTag {
            tag,
            message: message.into(),
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Io(Arc::new(err))
    }
}

/// Error during binary or JSON encoding.
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("circular reference in data structure")]
    CircularReference,

    #[error("nesting depth exceeds maximum {max}")]
    NestingTooDeep { max: usize },

    #[error("formatting failed")]
    Format(#[from] std::fmt::Error),

    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::Io(Arc::new(err))
    }
}

/// An accessor was called on a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, found {found}")]
pub struct TypeError {
    pub expected: &'static str,
    pub found: ItemKind,
}

/// A numeric conversion or operation left the representable range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("value is NaN or infinity")]
    NotFinite,

    #[error("value out of range for {target}")]
    OutOfRange { target: &'static str },

    #[error("division by zero")]
    DivisionByZero,
}

/// A constructor or mutator received an invalid argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("unpaired surrogate at index {index}")]
    UnpairedSurrogate { index: usize },

    #[error("simple value {value} is reserved")]
    ReservedSimpleValue { value: u8 },

    #[error("index {index} out of bounds (length: {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("denominator is zero")]
    ZeroDenominator,
}

/// Error returned by the numeric accessors on [`crate::Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Range(#[from] RangeError),
}
