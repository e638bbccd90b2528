//! JSON text output for [`Value`]s.
//!
//! JSON has no room for most CBOR types, so the mapping is lossy: byte
//! strings become base64url (or base64 / base16 under tags 22 / 23), other
//! tags are dropped, non-finite numbers and non-boolean simple values become
//! `null`, and maps with non-text keys are written with every key turned
//! into a string.

use std::fmt::Write as _;

use data_encoding::{BASE64, BASE64URL_NOPAD, HEXUPPER};
use indexmap::IndexMap;
use log::debug;
use num_bigint::BigUint;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::error::EncodeError;
use crate::limits::{JSON_EXPONENT_LIMIT, MAX_NESTING_DEPTH, STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::model::{write_escaped_text, Array, Map, Value};
use crate::number::{ExtendedNumber, Numeric, Special};
use crate::tags::{TAG_EXPECT_BASE16, TAG_EXPECT_BASE64};

pub(crate) struct JsonWriter {
    out: String,
    ancestors: FxHashSet<usize>,
    depth: usize,
}

/// Drops an all-zero fraction from a shortest round-trip float.
fn format_float(text: String) -> String {
    match text.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => text,
    }
}

impl JsonWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            ancestors: FxHashSet::default(),
            depth: 0,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    pub(crate) fn write_value(&mut self, value: &Value) -> Result<(), EncodeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || self.write_value_inner(value))
    }

    fn write_value_inner(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Integer(v) => write!(self.out, "{}", v)?,
            Value::BigInt(v) => write!(self.out, "{}", v)?,
            Value::ByteString(bytes) => self.write_bytes(bytes, None),
            Value::TextString(text) => write_escaped_text(&mut self.out, text)?,
            Value::Array(array) => self.write_array(array)?,
            Value::Map(map) => self.write_map(map)?,
            Value::Simple(simple) => self.out.push_str(match simple.code() {
                20 => "false",
                21 => "true",
                _ => "null",
            }),
            Value::Single(v) => self.write_f64(f64::from(*v), format!("{:?}", v)),
            Value::Double(v) => self.write_f64(*v, format!("{:?}", v)),
            Value::Decimal(d) => self.write_extended(d)?,
            Value::Float(f) => self.write_extended(f)?,
            Value::Rational(r) => {
                let approx = Numeric::as_f64(r);
                self.write_f64(approx, format!("{:?}", approx));
            }
            Value::Tagged { .. } => match value.untagged() {
                Value::ByteString(bytes) => self.write_bytes(bytes, value.innermost_tag()),
                inner => self.write_value(inner)?,
            },
        }
        Ok(())
    }

    fn write_f64(&mut self, value: f64, debug_text: String) {
        if value.is_finite() {
            self.out.push_str(&format_float(debug_text));
        } else {
            self.out.push_str("null");
        }
    }

    fn write_extended<const RADIX: u32>(
        &mut self,
        value: &ExtendedNumber<RADIX>,
    ) -> Result<(), EncodeError>
    where
        ExtendedNumber<RADIX>: Numeric + std::fmt::Display,
    {
        if value.special() != Special::Finite {
            self.out.push_str("null");
            return Ok(());
        }
        if value.exponent().magnitude() > &BigUint::from(JSON_EXPONENT_LIMIT) {
            let approx = Numeric::as_f64(value);
            self.write_f64(approx, format!("{:?}", approx));
            return Ok(());
        }
        write!(self.out, "{}", value)?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8], tag: Option<u64>) {
        let encoded = match tag {
            Some(TAG_EXPECT_BASE64) => BASE64.encode(bytes),
            Some(TAG_EXPECT_BASE16) => HEXUPPER.encode(bytes),
            _ => BASE64URL_NOPAD.encode(bytes),
        };
        self.out.push('"');
        self.out.push_str(&encoded);
        self.out.push('"');
    }

    fn enter(&mut self, identity: usize) -> Result<(), EncodeError> {
        if !self.ancestors.insert(identity) {
            debug!("JSON write aborted: container refers to itself");
            return Err(EncodeError::CircularReference);
        }
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            debug!("JSON write aborted: nesting exceeds {}", MAX_NESTING_DEPTH);
            return Err(EncodeError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }

    fn leave(&mut self, identity: usize) {
        self.ancestors.remove(&identity);
        self.depth -= 1;
    }

    fn write_array(&mut self, array: &Array) -> Result<(), EncodeError> {
        let identity = array.identity();
        self.enter(identity)?;
        self.out.push('[');
        for (i, item) in array.borrow().iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.write_value(item)?;
        }
        self.out.push(']');
        self.leave(identity);
        Ok(())
    }

    /// JSON text of a non-text map key.
    fn key_text(&mut self, key: &Value) -> Result<String, EncodeError> {
        let start = self.out.len();
        self.write_value(key)?;
        Ok(self.out.split_off(start))
    }

    fn write_map(&mut self, map: &Map) -> Result<(), EncodeError> {
        let identity = map.identity();
        self.enter(identity)?;
        let storage = map.borrow();
        let all_text = storage
            .keys()
            .all(|key| matches!(key.untagged(), Value::TextString(_)));

        self.out.push('{');
        if all_text {
            for (i, (key, value)) in storage.iter().enumerate() {
                if i > 0 {
                    self.out.push(',');
                }
                self.write_value(key)?;
                self.out.push(':');
                self.write_value(value)?;
            }
        } else {
            // Later entries overwrite earlier ones whose keys stringify alike.
            let mut entries: IndexMap<String, &Value, FxBuildHasher> = IndexMap::default();
            for (key, value) in storage.iter() {
                let text = match key.untagged() {
                    Value::TextString(text) => text.clone(),
                    other => self.key_text(other)?,
                };
                entries.insert(text, value);
            }
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    self.out.push(',');
                }
                write_escaped_text(&mut self.out, &key)?;
                self.out.push(':');
                self.write_value(value)?;
            }
        }
        self.out.push('}');
        drop(storage);
        self.leave(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::{ExtendedDecimal, ExtendedFloat, ExtendedRational};
    use num_bigint::BigInt;

    fn json(value: impl Into<Value>) -> String {
        let mut writer = JsonWriter::new();
        writer.write_value(&value.into()).unwrap();
        writer.finish()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(json(12), "12");
        assert_eq!(json(BigInt::from(1) << 70usize), "1180591620717411303424");
        assert_eq!(json(1.0f64), "1");
        assert_eq!(json(-0.0f64), "-0");
        assert_eq!(json(1.5f64), "1.5");
        assert_eq!(json(0.1f32), "0.1");
        assert_eq!(json(1e300f64), "1e300");
        assert_eq!(json(f64::NAN), "null");
        assert_eq!(json(f32::NEG_INFINITY), "null");
    }

    #[test]
    fn test_extended_numbers() {
        let d = ExtendedDecimal::new(BigInt::from(150), BigInt::from(-2));
        assert_eq!(json(Value::Decimal(d)), "1.50");
        let big = ExtendedDecimal::new(BigInt::from(1), BigInt::from(400));
        assert_eq!(json(Value::Decimal(big)), "1E+400");
        let huge = ExtendedDecimal::new(BigInt::from(1), BigInt::from(3000));
        assert_eq!(json(Value::Decimal(huge)), "null");
        let tiny = ExtendedDecimal::new(BigInt::from(15), BigInt::from(-3000));
        assert_eq!(json(Value::Decimal(tiny)), "0");
        assert_eq!(json(Value::Decimal(ExtendedDecimal::nan())), "null");

        let f = ExtendedFloat::new(BigInt::from(3), BigInt::from(-1));
        assert_eq!(json(Value::Float(f)), "1.5");

        let third = ExtendedRational::new(BigInt::from(1), BigInt::from(3)).unwrap();
        assert_eq!(json(Value::Rational(third)), format!("{:?}", 1.0f64 / 3.0));
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(json(true), "true");
        assert_eq!(json(Value::NULL), "null");
        assert_eq!(json(Value::UNDEFINED), "null");
        assert_eq!(json(Value::simple(99).unwrap()), "null");
    }

    #[test]
    fn test_byte_strings() {
        let bytes = vec![0xfb, 0xff, 0x01];
        assert_eq!(json(bytes.clone()), "\"-_8B\"");
        assert_eq!(json(Value::tagged(22, bytes.clone())), "\"+/8B\"");
        assert_eq!(json(Value::tagged(23, bytes.clone())), "\"FBFF01\"");
        assert_eq!(json(Value::tagged(1, Value::tagged(22, vec![1u8]))), "\"AQ==\"");
        assert_eq!(json(Value::tagged(1000, "x")), "\"x\"");
    }

    #[test]
    fn test_text_escapes() {
        assert_eq!(json("a\"b\\c\n\u{01}"), "\"a\\\"b\\\\c\\n\\u0001\"");
    }

    #[test]
    fn test_maps() {
        let map = Map::new();
        map.insert("a", 1);
        map.insert("b", vec![Value::from(1), Value::NULL]);
        assert_eq!(json(Value::Map(map)), r#"{"a":1,"b":[1,null]}"#);

        let mixed = Map::new();
        mixed.insert(1, "x");
        mixed.insert(vec![Value::from(1), Value::from(2)], "y");
        mixed.insert("1", "z");
        assert_eq!(json(Value::Map(mixed)), r#"{"1":"z","[1,2]":"y"}"#);
    }

    #[test]
    fn test_tagged_text_keys() {
        let map = Map::new();
        map.insert(Value::tagged(0, "2024-01-01"), 1);
        assert_eq!(json(Value::Map(map)), r#"{"2024-01-01":1}"#);

        let mixed = Map::new();
        mixed.insert(Value::tagged(0, "2024-01-01"), 1);
        mixed.insert(2, 3);
        assert_eq!(json(Value::Map(mixed)), r#"{"2024-01-01":1,"2":3}"#);
    }

    #[test]
    fn test_circular_reference() {
        let map = Map::new();
        map.insert("self", Value::Map(map.clone()));
        let mut writer = JsonWriter::new();
        let err = writer.write_value(&Value::Map(map.clone())).unwrap_err();
        assert!(matches!(err, EncodeError::CircularReference));
        map.clear();
    }
}
