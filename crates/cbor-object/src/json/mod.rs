//! Conversion between [`Value`] and JSON text.
//!
//! Parsing keeps numbers exact: integers become `Integer` or `BigInt`, and
//! everything with a fraction or exponent becomes an `ExtendedDecimal`
//! (`1.50` stays `150 * 10^-2`). Writing is lossy for types JSON lacks;
//! see [`to_json_string`].

mod parser;
mod source;
mod writer;

pub use parser::JsonOptions;
pub use source::{CodePointSource, StrSource, Utf8Source};

use std::io::{Read, Write};

use crate::error::{DecodeError, EncodeError};
use crate::model::Value;

use parser::Parser;
use writer::JsonWriter;

// =============================================================================
// PARSING
// =============================================================================

/// Parses a JSON document with default options.
pub fn from_json_str(text: &str) -> Result<Value, DecodeError> {
    from_json_str_with(text, JsonOptions::default())
}

/// Parses a JSON document. Text that starts with a byte order mark is
/// rejected, since a decoded string should not carry one.
pub fn from_json_str_with(text: &str, options: JsonOptions) -> Result<Value, DecodeError> {
    if text.starts_with('\u{feff}') {
        return Err(DecodeError::Json {
            offset: 0,
            message: "byte order mark not allowed",
        });
    }
    Parser::new(StrSource::new(text), options).parse_document()
}

/// Parses a UTF-8 JSON document from a stream with default options.
pub fn from_json_reader(reader: impl Read) -> Result<Value, DecodeError> {
    from_json_reader_with(reader, JsonOptions::default())
}

/// Parses a UTF-8 JSON document from a stream, skipping a leading byte
/// order mark.
pub fn from_json_reader_with(reader: impl Read, options: JsonOptions) -> Result<Value, DecodeError> {
    let mut parser = Parser::new(Utf8Source::new(reader), options);
    parser.skip_bom()?;
    parser.parse_document()
}

/// Parses a document from any code point source.
pub fn from_code_points(
    source: impl CodePointSource,
    options: JsonOptions,
) -> Result<Value, DecodeError> {
    Parser::new(source, options).parse_document()
}

// =============================================================================
// WRITING
// =============================================================================

/// Writes a value as compact JSON text.
///
/// - integers and bignums verbatim; floats in shortest round-trip form with
///   an all-zero fraction dropped (`1.0` is written `1`)
/// - decimal and binary floats exactly, unless the exponent exceeds
///   [`JSON_EXPONENT_LIMIT`](crate::limits::JSON_EXPONENT_LIMIT); rationals
///   as their nearest double
/// - NaN, infinities, `undefined` and simple values other than booleans as
///   `null`
/// - byte strings as unpadded base64url, padded base64 under tag 22 and
///   uppercase base16 under tag 23; other tags are not written
/// - maps with any non-text key get every key converted to its JSON text;
///   when two keys convert alike, the later entry wins
///
/// Fails on circular references.
pub fn to_json_string(value: &Value) -> Result<String, EncodeError> {
    let mut writer = JsonWriter::new();
    writer.write_value(value)?;
    Ok(writer.finish())
}

/// Writes a value as UTF-8 JSON bytes, without a byte order mark.
pub fn to_json_bytes(value: &Value) -> Result<Vec<u8>, EncodeError> {
    to_json_string(value).map(String::into_bytes)
}

pub fn write_json(value: &Value, mut out: impl Write) -> Result<(), EncodeError> {
    out.write_all(to_json_string(value)?.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_handling() {
        assert!(matches!(
            from_json_str("\u{feff}[1]"),
            Err(DecodeError::Json { offset: 0, .. })
        ));
        let value = from_json_reader(&b"\xef\xbb\xbf[1]"[..]).unwrap();
        assert_eq!(value, Value::from(vec![Value::from(1)]));
        assert!(!to_json_bytes(&value).unwrap().starts_with(&[0xef]));
    }

    #[test]
    fn test_reader_rejects_invalid_utf8() {
        let err = from_json_reader(&b"[\"\xc3\x28\"]"[..]).unwrap_err();
        assert!(matches!(err, DecodeError::Json { offset: 2, message: "invalid UTF-8" }));
    }

    #[test]
    fn test_text_round_trip() {
        let text = r#"{"name":"café","tags":["a","b"],"n":-1.25e-3,"ok":true,"none":null}"#;
        let value = from_json_str(text).unwrap();
        let written = to_json_string(&value).unwrap();
        assert_eq!(from_json_str(&written).unwrap(), value);
        assert!(written.contains("\"café\""));
    }

    #[test]
    fn test_write_json_to_stream() {
        let mut out = Vec::new();
        write_json(&Value::from(vec![Value::from(1), Value::from(2)]), &mut out).unwrap();
        assert_eq!(out, b"[1,2]");
    }
}
