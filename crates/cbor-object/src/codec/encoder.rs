//! Binary encoding of [`Value`]s.
//!
//! Integers and lengths always use the shortest form. Numbers outside the
//! native CBOR types are written as tagged items: bignums (2/3), decimal
//! fractions and bigfloats (4/5, or 264/265 when the exponent exceeds 64
//! bits) and rationals (30).

use std::io::Write;

use log::debug;
use num_bigint::BigInt;
use num_traits::One;
use rustc_hash::FxHashSet;

use crate::codec::header::{
    BREAK, INDEFINITE, MAJOR_ARRAY, MAJOR_BYTES, MAJOR_MAP, MAJOR_NEGATIVE, MAJOR_TAG,
    MAJOR_TEXT, MAJOR_UNSIGNED,
};
use crate::codec::primitives::Writer;
use crate::error::EncodeError;
use crate::limits::{MAX_NESTING_DEPTH, STACK_RED_ZONE, STACK_SEGMENT_SIZE, STRING_CHUNK_SIZE};
use crate::model::{Array, Map, SimpleValue, Value};
use crate::number::{ExtendedNumber, ExtendedRational, Numeric, Special};
use crate::tags::{
    TAG_BIGFLOAT, TAG_DECIMAL_FRACTION, TAG_EXTENDED_BIGFLOAT, TAG_EXTENDED_DECIMAL,
    TAG_NEGATIVE_BIGNUM, TAG_POSITIVE_BIGNUM, TAG_RATIONAL,
};

/// Options for binary encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Enable canonical encoding mode.
    ///
    /// When enabled, map entries are written in [`Value::compare`] order of
    /// their keys, so equal maps encode to identical bytes whatever their
    /// insertion order.
    pub canonical: bool,

    /// Write strings longer than [`STRING_CHUNK_SIZE`] bytes as
    /// indefinite-length strings of bounded chunks.
    pub stream_strings: bool,
}

impl EncodeOptions {
    /// Creates default (non-canonical) encoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates canonical encoding options.
    pub fn canonical() -> Self {
        Self {
            canonical: true,
            ..Self::default()
        }
    }

    pub fn with_stream_strings(mut self) -> Self {
        self.stream_strings = true;
        self
    }
}

/// CBOR encoder writing to any `io::Write`.
#[derive(Debug)]
pub struct Encoder<W> {
    writer: Writer<W>,
    options: EncodeOptions,
    /// Identities of the containers being written.
    ancestors: FxHashSet<usize>,
    depth: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W) -> Self {
        Self::with_options(inner, EncodeOptions::default())
    }

    pub fn with_options(inner: W, options: EncodeOptions) -> Self {
        Self {
            writer: Writer::new(inner),
            options,
            ancestors: FxHashSet::default(),
            depth: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Writes one top-level item.
    pub fn encode(&mut self, value: &Value) -> Result<(), EncodeError> {
        self.ancestors.clear();
        self.depth = 0;
        self.write_item(value)
    }

    fn enter(&mut self) -> Result<(), EncodeError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            debug!("encode aborted: nesting exceeds {}", MAX_NESTING_DEPTH);
            return Err(EncodeError::NestingTooDeep {
                max: MAX_NESTING_DEPTH,
            });
        }
        Ok(())
    }

    fn enter_container(&mut self, identity: usize) -> Result<(), EncodeError> {
        if !self.ancestors.insert(identity) {
            debug!("encode aborted: container refers to itself");
            return Err(EncodeError::CircularReference);
        }
        self.enter()
    }

    fn leave_container(&mut self, identity: usize) {
        self.ancestors.remove(&identity);
        self.depth -= 1;
    }

    fn write_item(&mut self, value: &Value) -> Result<(), EncodeError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || self.write_item_inner(value))
    }

    fn write_item_inner(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Integer(v) => self.write_integer(*v),
            Value::BigInt(v) => self.write_big_int(v),
            Value::ByteString(bytes) => self.write_bytes(bytes),
            Value::TextString(text) => self.write_text(text),
            Value::Array(array) => self.write_array(array),
            Value::Map(map) => self.write_map(map),
            Value::Simple(simple) => self.write_simple(*simple),
            Value::Single(v) => self.writer.write_f32(*v),
            Value::Double(v) => self.writer.write_f64(*v),
            Value::Decimal(d) => {
                self.write_extended(d, TAG_DECIMAL_FRACTION, TAG_EXTENDED_DECIMAL)
            }
            Value::Float(f) => self.write_extended(f, TAG_BIGFLOAT, TAG_EXTENDED_BIGFLOAT),
            Value::Rational(r) => self.write_rational(r),
            Value::Tagged { tag, inner } => {
                self.writer.write_header(MAJOR_TAG, *tag)?;
                self.enter()?;
                self.write_item(inner)?;
                self.depth -= 1;
                Ok(())
            }
        }
    }

    fn write_integer(&mut self, v: i64) -> Result<(), EncodeError> {
        if v >= 0 {
            self.writer.write_header(MAJOR_UNSIGNED, v as u64)
        } else {
            // -1 - v, computed without overflow
            self.writer.write_header(MAJOR_NEGATIVE, !v as u64)
        }
    }

    fn write_big_int(&mut self, v: &BigInt) -> Result<(), EncodeError> {
        if let Ok(small) = i64::try_from(v) {
            return self.write_integer(small);
        }
        let (tag, magnitude) = if v.sign() == num_bigint::Sign::Minus {
            (TAG_NEGATIVE_BIGNUM, (BigInt::from(-1) - v).magnitude().to_bytes_be())
        } else {
            (TAG_POSITIVE_BIGNUM, v.magnitude().to_bytes_be())
        };
        self.writer.write_header(MAJOR_TAG, tag)?;
        self.writer.write_header(MAJOR_BYTES, magnitude.len() as u64)?;
        self.writer.write_bytes(&magnitude)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        if self.options.stream_strings && bytes.len() > STRING_CHUNK_SIZE {
            self.writer.write_byte(MAJOR_BYTES << 5 | INDEFINITE)?;
            for chunk in bytes.chunks(STRING_CHUNK_SIZE) {
                self.writer.write_header(MAJOR_BYTES, chunk.len() as u64)?;
                self.writer.write_bytes(chunk)?;
            }
            return self.writer.write_byte(BREAK);
        }
        self.writer.write_header(MAJOR_BYTES, bytes.len() as u64)?;
        self.writer.write_bytes(bytes)
    }

    fn write_text(&mut self, text: &str) -> Result<(), EncodeError> {
        if self.options.stream_strings && text.len() > STRING_CHUNK_SIZE {
            self.writer.write_byte(MAJOR_TEXT << 5 | INDEFINITE)?;
            let mut rest = text;
            while !rest.is_empty() {
                let mut end = rest.len().min(STRING_CHUNK_SIZE);
                while !rest.is_char_boundary(end) {
                    end -= 1;
                }
                let (chunk, tail) = rest.split_at(end);
                self.writer.write_header(MAJOR_TEXT, chunk.len() as u64)?;
                self.writer.write_bytes(chunk.as_bytes())?;
                rest = tail;
            }
            return self.writer.write_byte(BREAK);
        }
        self.writer.write_header(MAJOR_TEXT, text.len() as u64)?;
        self.writer.write_bytes(text.as_bytes())
    }

    fn write_array(&mut self, array: &Array) -> Result<(), EncodeError> {
        let identity = array.identity();
        self.enter_container(identity)?;
        let items = array.borrow();
        self.writer.write_header(MAJOR_ARRAY, items.len() as u64)?;
        for item in items.iter() {
            self.write_item(item)?;
        }
        drop(items);
        self.leave_container(identity);
        Ok(())
    }

    fn write_map(&mut self, map: &Map) -> Result<(), EncodeError> {
        let identity = map.identity();
        self.enter_container(identity)?;
        let storage = map.borrow();
        self.writer.write_header(MAJOR_MAP, storage.len() as u64)?;
        let mut entries: Vec<(&Value, &Value)> = storage.iter().collect();
        if self.options.canonical {
            entries.sort_by(|a, b| a.0.compare(b.0));
        }
        for (key, value) in entries {
            self.write_item(key)?;
            self.write_item(value)?;
        }
        drop(storage);
        self.leave_container(identity);
        Ok(())
    }

    fn write_simple(&mut self, simple: SimpleValue) -> Result<(), EncodeError> {
        let code = simple.code();
        if code < 24 {
            self.writer.write_byte(0xe0 | code)
        } else {
            self.writer.write_byte(0xf8)?;
            self.writer.write_byte(code)
        }
    }

    fn write_extended<const RADIX: u32>(
        &mut self,
        value: &ExtendedNumber<RADIX>,
        small_tag: u64,
        big_tag: u64,
    ) -> Result<(), EncodeError>
    where
        ExtendedNumber<RADIX>: Numeric,
    {
        if value.special() != Special::Finite || value.is_negative_zero() {
            return self.writer.write_f64(Numeric::as_f64(value));
        }
        let exponent = value.exponent();
        if num_traits::Zero::is_zero(exponent) {
            return self.write_big_int(&value.mantissa());
        }
        let tag = if i64::try_from(exponent).is_ok() { small_tag } else { big_tag };
        self.writer.write_header(MAJOR_TAG, tag)?;
        self.writer.write_header(MAJOR_ARRAY, 2)?;
        self.write_big_int(exponent)?;
        self.write_big_int(&value.mantissa())
    }

    fn write_rational(&mut self, value: &ExtendedRational) -> Result<(), EncodeError> {
        if value.special() != Special::Finite || value.is_negative_zero() {
            return self.writer.write_f64(Numeric::as_f64(value));
        }
        let numerator = value.numerator();
        if value.unsigned_denominator().is_one() {
            return self.write_big_int(&numerator);
        }
        self.writer.write_header(MAJOR_TAG, TAG_RATIONAL)?;
        self.writer.write_header(MAJOR_ARRAY, 2)?;
        self.write_big_int(&numerator)?;
        self.write_big_int(&value.denominator())
    }
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Encodes a value to bytes.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, EncodeError> {
    encode_value_with_options(value, EncodeOptions::default())
}

/// Encodes a value to bytes with the given options.
pub fn encode_value_with_options(
    value: &Value,
    options: EncodeOptions,
) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::with_options(Vec::new(), options);
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// Writes a value to a stream.
pub fn write_value(value: &Value, out: impl Write) -> Result<(), EncodeError> {
    write_value_with_options(value, out, EncodeOptions::default())
}

pub fn write_value_with_options(
    value: &Value,
    out: impl Write,
    options: EncodeOptions,
) -> Result<(), EncodeError> {
    Encoder::with_options(out, options).encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_from_bytes;
    use crate::number::{ExtendedDecimal, ExtendedFloat};

    fn encode(value: impl Into<Value>) -> Vec<u8> {
        encode_value(&value.into()).unwrap()
    }

    #[test]
    fn test_integers() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(500), vec![0x19, 0x01, 0xf4]);
        assert_eq!(encode(-1), vec![0x20]);
        assert_eq!(encode(-500), vec![0x39, 0x01, 0xf3]);
        assert_eq!(encode(i64::MIN), {
            let mut v = vec![0x3b];
            v.extend_from_slice(&(i64::MAX as u64).to_be_bytes());
            v
        });
    }

    #[test]
    fn test_bignums() {
        let two_63 = BigInt::from(1u64 << 63);
        assert_eq!(
            encode(two_63.clone()),
            vec![0xc2, 0x48, 0x80, 0, 0, 0, 0, 0, 0, 0]
        );
        let below = -BigInt::from(1u64 << 63) - 1;
        assert_eq!(
            encode(below),
            vec![0xc3, 0x48, 0x80, 0, 0, 0, 0, 0, 0, 0]
        );
        // a non-normalized BigInt that fits is written as a plain integer
        assert_eq!(encode_value(&Value::BigInt(BigInt::from(5))).unwrap(), vec![0x05]);
    }

    #[test]
    fn test_strings_and_simple() {
        assert_eq!(encode("a"), vec![0x61, b'a']);
        assert_eq!(encode(vec![1u8, 2]), vec![0x42, 1, 2]);
        assert_eq!(encode(true), vec![0xf5]);
        assert_eq!(encode(Value::NULL), vec![0xf6]);
        assert_eq!(encode(Value::simple(255).unwrap()), vec![0xf8, 0xff]);
        assert_eq!(encode(1.5f32), vec![0xfa, 0x3f, 0xc0, 0x00, 0x00]);
        assert_eq!(encode(1.5f64), vec![0xfb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_extended_numbers() {
        let decimal = ExtendedDecimal::new(BigInt::from(27315), BigInt::from(-2));
        assert_eq!(
            encode(Value::Decimal(decimal)),
            vec![0xc4, 0x82, 0x21, 0x19, 0x6a, 0xb3]
        );

        let float = ExtendedFloat::new(BigInt::from(3), BigInt::from(-1));
        assert_eq!(encode(Value::Float(float)), vec![0xc5, 0x82, 0x20, 0x03]);

        let zero_exponent = ExtendedDecimal::new(BigInt::from(7), BigInt::from(0));
        assert_eq!(encode(Value::Decimal(zero_exponent)), vec![0x07]);

        let huge = ExtendedDecimal::new(BigInt::from(1), BigInt::from(1) << 70usize);
        let bytes = encode(Value::Decimal(huge.clone()));
        assert_eq!(&bytes[..3], &[0xd9, 0x01, 0x08]);
        assert_eq!(decode_from_bytes(&bytes).unwrap(), Value::Decimal(huge));

        let nan = encode(Value::Decimal(ExtendedDecimal::nan()));
        assert_eq!(nan[0], 0xfb);
        assert!(f64::from_be_bytes(nan[1..].try_into().unwrap()).is_nan());

        let negative_zero = ExtendedDecimal::from_parts(true, Default::default(), BigInt::from(0));
        let bytes = encode(Value::Decimal(negative_zero));
        assert_eq!(bytes, encode(-0.0f64));
    }

    #[test]
    fn test_rationals() {
        let third = ExtendedRational::new(BigInt::from(1), BigInt::from(3)).unwrap();
        assert_eq!(encode(Value::Rational(third)), vec![0xd8, 0x1e, 0x82, 0x01, 0x03]);
        let whole = ExtendedRational::new(BigInt::from(-4), BigInt::from(1)).unwrap();
        assert_eq!(encode(Value::Rational(whole)), vec![0x23]);
    }

    #[test]
    fn test_tags() {
        assert_eq!(encode(Value::tagged(1000, 1)), vec![0xd9, 0x03, 0xe8, 0x01]);
        let chain = Value::tagged(1, Value::tagged(2, "x"));
        assert_eq!(encode(chain), vec![0xc1, 0xc2, 0x61, b'x']);
    }

    #[test]
    fn test_canonical_map_order() {
        let map = Map::new();
        map.insert(Value::from(vec![Value::from(100)]), 0);
        map.insert("z", 0);
        map.insert(10, 0);
        map.insert("aa", 0);
        map.insert(-1, 0);
        let value = Value::Map(map);

        let plain = encode_value(&value).unwrap();
        assert_eq!(&plain[..4], &[0xa5, 0x81, 0x18, 0x64]);

        let canonical = encode_value_with_options(&value, EncodeOptions::canonical()).unwrap();
        assert_eq!(
            canonical,
            vec![
                0xa5, 0x20, 0x00, 0x0a, 0x00, 0x62, b'a', b'a', 0x00, 0x61, b'z', 0x00, 0x81,
                0x18, 0x64, 0x00
            ]
        );
    }

    #[test]
    fn test_stream_strings() {
        let text: String = std::iter::repeat('é').take(STRING_CHUNK_SIZE).collect();
        let options = EncodeOptions::new().with_stream_strings();
        let bytes = encode_value_with_options(&Value::text(text.clone()), options).unwrap();
        assert_eq!(bytes[0], 0x7f);
        assert_eq!(*bytes.last().unwrap(), 0xff);
        assert_eq!(decode_from_bytes(&bytes).unwrap(), Value::text(text.clone()));

        let short = encode_value_with_options(&Value::text("abc"), options).unwrap();
        assert_eq!(short, vec![0x63, b'a', b'b', b'c']);

        let bytes = vec![7u8; STRING_CHUNK_SIZE * 2 + 1];
        let encoded = encode_value_with_options(&Value::bytes(bytes.clone()), options).unwrap();
        assert_eq!(encoded[0], 0x5f);
        assert_eq!(decode_from_bytes(&encoded).unwrap(), Value::bytes(bytes));
    }

    #[test]
    fn test_circular_reference() {
        let array = Array::new();
        array.push(1);
        array.push(Value::Array(array.clone()));
        let err = encode_value(&Value::Array(array.clone())).unwrap_err();
        assert!(matches!(err, EncodeError::CircularReference));
        array.clear();

        // the same container twice is not a cycle
        let shared = Value::from(vec![Value::from(1)]);
        let twice = Value::from(vec![shared.clone(), shared]);
        assert_eq!(encode(twice), vec![0x82, 0x81, 0x01, 0x81, 0x01]);
    }

    #[test]
    fn test_nesting_limit() {
        let mut value = Value::from(0);
        for _ in 0..=MAX_NESTING_DEPTH {
            value = Value::from(vec![value]);
        }
        assert!(matches!(
            encode_value(&value),
            Err(EncodeError::NestingTooDeep { max: MAX_NESTING_DEPTH })
        ));
    }

    #[test]
    fn test_write_value_to_stream() {
        let mut out = Vec::new();
        write_value(&Value::from(vec![Value::from(1), Value::from(2)]), &mut out).unwrap();
        assert_eq!(out, vec![0x82, 0x01, 0x02]);
    }
}
