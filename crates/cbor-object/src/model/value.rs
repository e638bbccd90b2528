//! The generic CBOR data item.

use num_bigint::BigInt;
use uuid::Uuid;

use crate::error::{ArgumentError, ConversionError, DecodeError, RangeError, TypeError};
use crate::model::{Array, ItemKind, Map, SimpleValue};
use crate::number::{
    ExtendedDecimal, ExtendedFloat, ExtendedRational, NumberRef, Numeric, Sign,
};
use crate::tags::default_registry;

/// Tag number for binary UUIDs.
pub const TAG_UUID: u64 = 37;

/// A CBOR data item.
///
/// Leaf payloads are owned values. [`Array`] and [`Map`] are shared
/// handles: cloning a `Value` that holds one clones the handle, so both
/// copies observe later mutations.
///
/// Tags wrap their payload outermost first:
/// `Tagged { tag: 1, inner: Tagged { tag: 2, inner: x } }` is `1(2(x))`.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    BigInt(BigInt),
    ByteString(Vec<u8>),
    TextString(String),
    Array(Array),
    Map(Map),
    Simple(SimpleValue),
    Single(f32),
    Double(f64),
    Decimal(ExtendedDecimal),
    Float(ExtendedFloat),
    Rational(ExtendedRational),
    Tagged { tag: u64, inner: Box<Value> },
}

impl Default for Value {
    fn default() -> Self {
        Value::NULL
    }
}

impl Value {
    pub const FALSE: Value = Value::Simple(SimpleValue::FALSE);
    pub const TRUE: Value = Value::Simple(SimpleValue::TRUE);
    pub const NULL: Value = Value::Simple(SimpleValue::NULL);
    pub const UNDEFINED: Value = Value::Simple(SimpleValue::UNDEFINED);

    // =========================================================================
    // Construction
    // =========================================================================

    pub fn text(text: impl Into<String>) -> Value {
        Value::TextString(text.into())
    }

    /// Builds a text string from UTF-16 code units, rejecting unpaired
    /// surrogates.
    pub fn text_from_utf16(units: &[u16]) -> Result<Value, ArgumentError> {
        let mut text = String::with_capacity(units.len());
        let mut index = 0;
        for decoded in char::decode_utf16(units.iter().copied()) {
            match decoded {
                Ok(c) => {
                    text.push(c);
                    index += c.len_utf16();
                }
                Err(_) => return Err(ArgumentError::UnpairedSurrogate { index }),
            }
        }
        Ok(Value::TextString(text))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Value {
        Value::ByteString(bytes.into())
    }

    /// Simple value by code. Codes 24..=31 are reserved.
    pub fn simple(code: u8) -> Result<Value, ArgumentError> {
        SimpleValue::new(code).map(Value::Simple)
    }

    pub fn bool(value: bool) -> Value {
        Value::Simple(SimpleValue::from(value))
    }

    pub fn new_array() -> Value {
        Value::Array(Array::new())
    }

    pub fn new_map() -> Value {
        Value::Map(Map::new())
    }

    /// Wraps `inner` in `tag` without validation.
    pub fn tagged(tag: u64, inner: impl Into<Value>) -> Value {
        Value::Tagged {
            tag,
            inner: Box::new(inner.into()),
        }
    }

    /// Wraps `inner` in `tag` and runs the default registry's validator,
    /// which may normalize the result (tag 2 yields an integer, for example).
    pub fn from_tag(tag: u64, inner: impl Into<Value>) -> Result<Value, DecodeError> {
        default_registry().apply_tag(inner.into(), tag)
    }

    /// Tag 37 around the UUID's 16 bytes.
    pub fn from_uuid(uuid: Uuid) -> Value {
        Value::tagged(TAG_UUID, Value::ByteString(uuid.as_bytes().to_vec()))
    }

    /// Reads a UUID from a value whose outermost tag is 37.
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Tagged { tag: TAG_UUID, inner } => match inner.as_ref() {
                Value::ByteString(bytes) => Uuid::from_slice(bytes).ok(),
                _ => None,
            },
            _ => None,
        }
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// The item under all tags.
    pub fn untagged(&self) -> &Value {
        let mut current = self;
        while let Value::Tagged { inner, .. } = current {
            current = inner;
        }
        current
    }

    /// Drops every tag, returning the innermost item.
    pub fn into_untagged(self) -> Value {
        let mut current = self;
        while let Value::Tagged { inner, .. } = current {
            current = *inner;
        }
        current
    }

    pub fn is_tagged(&self) -> bool {
        matches!(self, Value::Tagged { .. })
    }

    /// Tag numbers, outermost first.
    pub fn tags(&self) -> Vec<u64> {
        let mut tags = Vec::new();
        let mut current = self;
        while let Value::Tagged { tag, inner } = current {
            tags.push(*tag);
            current = inner;
        }
        tags
    }

    pub fn outermost_tag(&self) -> Option<u64> {
        match self {
            Value::Tagged { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    pub fn innermost_tag(&self) -> Option<u64> {
        self.tags().last().copied()
    }

    pub fn has_tag(&self, tag: u64) -> bool {
        let mut current = self;
        while let Value::Tagged { tag: t, inner } = current {
            if *t == tag {
                return true;
            }
            current = inner;
        }
        false
    }

    /// Kind of the untagged item.
    pub fn kind(&self) -> ItemKind {
        match self {
            Value::Integer(_) => ItemKind::Integer,
            Value::BigInt(_) => ItemKind::BigInt,
            Value::ByteString(_) => ItemKind::ByteString,
            Value::TextString(_) => ItemKind::TextString,
            Value::Array(_) => ItemKind::Array,
            Value::Map(_) => ItemKind::Map,
            Value::Simple(_) => ItemKind::Simple,
            Value::Single(_) => ItemKind::Single,
            Value::Double(_) => ItemKind::Double,
            Value::Decimal(_) => ItemKind::Decimal,
            Value::Float(_) => ItemKind::Float,
            Value::Rational(_) => ItemKind::Rational,
            Value::Tagged { inner, .. } => inner.kind(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn is_null(&self) -> bool {
        matches!(self.untagged(), Value::Simple(SimpleValue::NULL))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.untagged(), Value::Simple(SimpleValue::UNDEFINED))
    }

    pub fn is_number(&self) -> bool {
        self.kind().is_number()
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.untagged() {
            Value::Simple(SimpleValue::TRUE) => Some(true),
            Value::Simple(SimpleValue::FALSE) => Some(false),
            _ => None,
        }
    }

    pub fn as_simple(&self) -> Result<SimpleValue, TypeError> {
        match self.untagged() {
            Value::Simple(s) => Ok(*s),
            _ => Err(self.type_error("simple value")),
        }
    }

    pub fn as_text(&self) -> Result<&str, TypeError> {
        match self.untagged() {
            Value::TextString(s) => Ok(s),
            _ => Err(self.type_error("text string")),
        }
    }

    pub fn as_byte_string(&self) -> Result<&[u8], TypeError> {
        match self.untagged() {
            Value::ByteString(b) => Ok(b),
            _ => Err(self.type_error("byte string")),
        }
    }

    pub fn as_array(&self) -> Result<&Array, TypeError> {
        match self.untagged() {
            Value::Array(a) => Ok(a),
            _ => Err(self.type_error("array")),
        }
    }

    pub fn as_map(&self) -> Result<&Map, TypeError> {
        match self.untagged() {
            Value::Map(m) => Ok(m),
            _ => Err(self.type_error("map")),
        }
    }

    /// Borrowed numeric view of the untagged item.
    pub fn as_number(&self) -> Option<NumberRef<'_>> {
        match self.untagged() {
            Value::Integer(v) => Some(NumberRef::Integer(*v)),
            Value::BigInt(v) => Some(NumberRef::BigInt(v)),
            Value::Single(v) => Some(NumberRef::Single(*v)),
            Value::Double(v) => Some(NumberRef::Double(*v)),
            Value::Decimal(v) => Some(NumberRef::Decimal(v)),
            Value::Float(v) => Some(NumberRef::Float(v)),
            Value::Rational(v) => Some(NumberRef::Rational(v)),
            _ => None,
        }
    }

    fn number(&self) -> Result<NumberRef<'_>, TypeError> {
        self.as_number().ok_or_else(|| self.type_error("number"))
    }

    fn type_error(&self, expected: &'static str) -> TypeError {
        TypeError {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_f64(&self) -> Result<f64, TypeError> {
        Ok(self.number()?.as_f64())
    }

    pub fn as_f32(&self) -> Result<f32, TypeError> {
        Ok(self.number()?.as_f32())
    }

    /// Truncates toward zero.
    pub fn as_i64(&self) -> Result<i64, ConversionError> {
        Ok(self.number()?.as_i64()?)
    }

    /// Truncates toward zero and checks `min..=max`.
    pub fn as_i32(&self, min: i32, max: i32) -> Result<i32, ConversionError> {
        Ok(self.number()?.as_i32(min, max)?)
    }

    pub fn as_big_integer(&self) -> Result<BigInt, ConversionError> {
        Ok(self.number()?.as_big_integer()?)
    }

    pub fn as_extended_decimal(&self) -> Result<ExtendedDecimal, TypeError> {
        Ok(self.number()?.as_extended_decimal())
    }

    pub fn as_extended_float(&self) -> Result<ExtendedFloat, TypeError> {
        Ok(self.number()?.as_extended_float())
    }

    pub fn as_extended_rational(&self) -> Result<ExtendedRational, TypeError> {
        Ok(self.number()?.as_extended_rational())
    }

    pub fn sign(&self) -> Result<Sign, TypeError> {
        Ok(self.number()?.sign())
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    pub fn negate(&self) -> Result<Value, TypeError> {
        Ok(self.number()?.negate())
    }

    pub fn abs(&self) -> Result<Value, TypeError> {
        Ok(self.number()?.abs())
    }

    pub fn add(&self, other: &Value) -> Result<Value, ConversionError> {
        self.binary(other, |a, b| a.add(b))
    }

    pub fn subtract(&self, other: &Value) -> Result<Value, ConversionError> {
        self.binary(other, |a, b| a.subtract(b))
    }

    pub fn multiply(&self, other: &Value) -> Result<Value, ConversionError> {
        self.binary(other, |a, b| a.multiply(b))
    }

    pub fn divide(&self, other: &Value) -> Result<Value, ConversionError> {
        self.binary(other, |a, b| a.divide(b))
    }

    pub fn remainder(&self, other: &Value) -> Result<Value, ConversionError> {
        self.binary(other, |a, b| a.remainder(b))
    }

    fn binary(
        &self,
        other: &Value,
        op: impl FnOnce(&NumberRef<'_>, &NumberRef<'_>) -> Result<Value, RangeError>,
    ) -> Result<Value, ConversionError> {
        let (a, b) = (self.number()?, other.number()?);
        Ok(op(&a, &b)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_surrogates() {
        let ok = Value::text_from_utf16(&[0x61, 0xD83D, 0xDE00]).unwrap();
        assert_eq!(ok, Value::text("a\u{1F600}"));

        let err = Value::text_from_utf16(&[0x61, 0x62, 0xD800, 0x63]).unwrap_err();
        assert_eq!(err, ArgumentError::UnpairedSurrogate { index: 2 });

        assert!(Value::text_from_utf16(&[0xDC00]).is_err());
    }

    #[test]
    fn test_tag_chain() {
        let value = Value::tagged(1, Value::tagged(2, Value::tagged(3, "x")));
        assert_eq!(value.tags(), vec![1, 2, 3]);
        assert_eq!(value.outermost_tag(), Some(1));
        assert_eq!(value.innermost_tag(), Some(3));
        assert!(value.has_tag(2));
        assert!(!value.has_tag(4));
        assert_eq!(value.untagged(), &Value::text("x"));
        assert_eq!(value.kind(), ItemKind::TextString);
        assert_eq!(value.as_text().unwrap(), "x");
    }

    #[test]
    fn test_accessor_type_errors() {
        let err = Value::text("a").as_i64().unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Type(TypeError {
                expected: "number",
                found: ItemKind::TextString
            })
        ));
        let err = Value::Double(f64::NAN).as_i64().unwrap_err();
        assert_eq!(err, ConversionError::Range(RangeError::NotFinite));
        assert!(Value::from(1).as_map().is_err());
    }

    #[test]
    fn test_uuid_roundtrip() {
        let uuid = Uuid::from_bytes([7u8; 16]);
        let value = Value::from_uuid(uuid);
        assert_eq!(value.outermost_tag(), Some(TAG_UUID));
        assert_eq!(value.as_uuid(), Some(uuid));
        assert_eq!(Value::text("x").as_uuid(), None);
    }

    #[test]
    fn test_value_arithmetic() {
        let sum = Value::from(2).add(&Value::Double(0.5)).unwrap();
        assert_eq!(sum, Value::Double(2.5));
        assert!(Value::from(1).divide(&Value::from(0)).is_err());
        assert!(Value::text("a").add(&Value::from(1)).is_err());
        assert_eq!(Value::from(-3).abs().unwrap(), Value::from(3));
    }
}
