//! Built-in tag validators.

use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};

use super::{ANY_FILTER, TagHandler, TypeFilter, is_valid_iri};
use crate::error::DecodeError;
use crate::limits::MAX_FRACTION_EXPONENT_BITS;
use crate::model::Value;
use crate::number::{ExtendedDecimal, ExtendedFloat, ExtendedRational};

fn integer_of(value: &Value) -> Option<BigInt> {
    match value {
        Value::Integer(v) => Some(BigInt::from(*v)),
        Value::BigInt(v) => Some(v.clone()),
        _ => None,
    }
}

fn integer_filter(description: &'static str) -> TypeFilter {
    TypeFilter::none()
        .with_integers()
        .with_tags(&[2, 3])
        .described(description)
}

// =============================================================================
// STRINGS
// =============================================================================

/// Tags 0 and 33-36: the payload must be a text string.
#[derive(Debug)]
pub(crate) struct TextTag {
    filter: TypeFilter,
}

impl TextTag {
    pub(crate) fn new() -> Self {
        TextTag {
            filter: TypeFilter::none()
                .with_text_string()
                .described("Not a text string"),
        }
    }
}

impl TagHandler for TextTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        match payload {
            Value::TextString(_) => Ok(Value::tagged(tag, payload)),
            _ => Err(DecodeError::invalid_tag(tag, "Not a text string")),
        }
    }
}

/// Tag 32: a text string holding an IRI reference.
#[derive(Debug)]
pub(crate) struct UriTag {
    filter: TypeFilter,
}

impl UriTag {
    pub(crate) fn new() -> Self {
        UriTag {
            filter: TypeFilter::none()
                .with_text_string()
                .described("Not a valid URI"),
        }
    }
}

impl TagHandler for UriTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        match &payload {
            Value::TextString(text) if is_valid_iri(text) => Ok(Value::tagged(tag, payload)),
            _ => Err(DecodeError::invalid_tag(tag, "Not a valid URI")),
        }
    }
}

/// Tag 37: 16-byte binary UUID.
#[derive(Debug)]
pub(crate) struct UuidTag {
    filter: TypeFilter,
}

impl UuidTag {
    pub(crate) fn new() -> Self {
        UuidTag {
            filter: TypeFilter::none()
                .with_byte_string()
                .described("UUID must be 16 bytes long"),
        }
    }
}

impl TagHandler for UuidTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        match &payload {
            Value::ByteString(bytes) if bytes.len() == 16 => Ok(Value::tagged(tag, payload)),
            _ => Err(DecodeError::invalid_tag(tag, "UUID must be 16 bytes long")),
        }
    }
}

// =============================================================================
// NUMBERS
// =============================================================================

/// Tags 2 and 3: unsigned and negative bignums.
#[derive(Debug)]
pub(crate) struct BignumTag {
    filter: TypeFilter,
}

impl BignumTag {
    pub(crate) fn new() -> Self {
        BignumTag {
            filter: TypeFilter::none()
                .with_byte_string()
                .with_any_tag()
                .described("Bignum requires a byte string"),
        }
    }
}

/// Decodes a big-endian magnitude; tag 3 yields `-(1 + n)`.
fn bignum_value(bytes: &[u8], negative: bool) -> Value {
    let significant = bytes
        .iter()
        .position(|b| *b != 0)
        .map_or(&[][..], |start| &bytes[start..]);
    if significant.len() <= 7 {
        let n = significant
            .iter()
            .fold(0i64, |acc, b| (acc << 8) | i64::from(*b));
        return Value::Integer(if negative { -1 - n } else { n });
    }
    let n = BigInt::from(BigUint::from_bytes_be(significant));
    Value::from(if negative { -n - 1 } else { n })
}

impl TagHandler for BignumTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        let inner_tags = payload.tags();
        let number = match payload.untagged() {
            Value::ByteString(bytes) => bignum_value(bytes, tag == 3),
            _ => return Err(DecodeError::invalid_tag(tag, "Bignum requires a byte string")),
        };
        Ok(inner_tags
            .into_iter()
            .rev()
            .fold(number, |inner, t| Value::tagged(t, inner)))
    }
}

/// Tags 4, 5, 264 and 265: `[exponent, mantissa]` fractions.
#[derive(Debug)]
pub(crate) struct FractionTag {
    filter: TypeFilter,
    decimal: bool,
    capped: bool,
}

impl FractionTag {
    /// `decimal` selects base 10 (tags 4 and 264) over base 2; `capped`
    /// limits the exponent to 64 bits (tags 4 and 5).
    pub(crate) fn new(decimal: bool, capped: bool) -> Self {
        FractionTag {
            filter: TypeFilter::none()
                .with_array_exact_length(
                    2,
                    vec![
                        integer_filter("Exponent is not an integer"),
                        integer_filter("Mantissa is not an integer"),
                    ],
                )
                .described(arity_message(decimal)),
            decimal,
            capped,
        }
    }
}

fn arity_message(decimal: bool) -> &'static str {
    if decimal {
        "Decimal fraction requires exactly 2 items"
    } else {
        "Bigfloat requires exactly 2 items"
    }
}

impl TagHandler for FractionTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        let (exponent, mantissa) = {
            let array = match &payload {
                Value::Array(array) if array.len() == 2 => array.borrow(),
                _ => return Err(DecodeError::invalid_tag(tag, arity_message(self.decimal))),
            };
            let exponent = integer_of(&array[0])
                .ok_or_else(|| DecodeError::invalid_tag(tag, "Exponent is not an integer"))?;
            let mantissa = integer_of(&array[1])
                .ok_or_else(|| DecodeError::invalid_tag(tag, "Mantissa is not an integer"))?;
            (exponent, mantissa)
        };
        if self.capped && exponent.abs().bits() > MAX_FRACTION_EXPONENT_BITS {
            return Err(DecodeError::invalid_tag(tag, "Exponent is too big"));
        }
        if exponent.is_zero() {
            return Ok(Value::from(mantissa));
        }
        Ok(if self.decimal {
            Value::from(ExtendedDecimal::new(mantissa, exponent))
        } else {
            Value::from(ExtendedFloat::new(mantissa, exponent))
        })
    }
}

/// Tag 30: `[numerator, denominator]` with a positive denominator.
#[derive(Debug)]
pub(crate) struct RationalTag {
    filter: TypeFilter,
}

impl RationalTag {
    pub(crate) fn new() -> Self {
        let part = integer_filter("Rational number requires integer numerator and denominator");
        RationalTag {
            filter: TypeFilter::none()
                .with_array_exact_length(2, vec![part.clone(), part])
                .described("Rational number requires exactly 2 items"),
        }
    }
}

impl TagHandler for RationalTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        let array = match &payload {
            Value::Array(array) if array.len() == 2 => array.borrow(),
            _ => {
                return Err(DecodeError::invalid_tag(
                    tag,
                    "Rational number requires exactly 2 items",
                ));
            }
        };
        let (Some(numerator), Some(denominator)) = (integer_of(&array[0]), integer_of(&array[1]))
        else {
            return Err(DecodeError::invalid_tag(
                tag,
                "Rational number requires integer numerator and denominator",
            ));
        };
        if !denominator.is_positive() {
            return Err(DecodeError::invalid_tag(
                tag,
                "Rational number requires denominator greater than 0",
            ));
        }
        let rational = ExtendedRational::new(numerator, denominator)
            .map_err(|err| DecodeError::invalid_tag(tag, err.to_string()))?;
        Ok(Value::from(rational))
    }
}

// =============================================================================
// REFERENCES AND HINTS
// =============================================================================

/// Tags 25 and 29: the payload is a reference index.
#[derive(Debug)]
pub(crate) struct IndexTag {
    filter: TypeFilter,
}

impl IndexTag {
    pub(crate) fn new() -> Self {
        IndexTag {
            filter: TypeFilter::none()
                .with_unsigned()
                .described("Not a 64-bit unsigned integer"),
        }
    }
}

impl TagHandler for IndexTag {
    fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        let fits = match &payload {
            Value::Integer(v) => *v >= 0,
            Value::BigInt(v) => !v.is_negative() && v.bits() <= 64,
            _ => false,
        };
        if !fits {
            return Err(DecodeError::invalid_tag(tag, "Not a 64-bit unsigned integer"));
        }
        Ok(Value::tagged(tag, payload))
    }
}

/// Tag 28: marks a shareable value. The tag itself is not kept.
#[derive(Debug)]
pub(crate) struct ShareableTag;

impl TagHandler for ShareableTag {
    fn filter(&self) -> &TypeFilter {
        &ANY_FILTER
    }

    fn validate(&self, _tag: u64, payload: Value) -> Result<Value, DecodeError> {
        Ok(payload)
    }
}

/// Tags 21-23 (expected conversion hints): any payload, kept as is.
#[derive(Debug)]
pub(crate) struct HintTag;

impl TagHandler for HintTag {
    fn filter(&self) -> &TypeFilter {
        &ANY_FILTER
    }

    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
        Ok(Value::tagged(tag, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<Value, DecodeError>) -> String {
        match result {
            Err(DecodeError::InvalidTag { message, .. }) => message.into_owned(),
            other => panic!("expected a tag error, got {:?}", other),
        }
    }

    fn pair(a: impl Into<Value>, b: impl Into<Value>) -> Value {
        vec![a.into(), b.into()].into()
    }

    #[test]
    fn test_bignum_fast_path_and_big() {
        let handler = BignumTag::new();
        assert_eq!(
            handler.validate(2, Value::bytes(vec![0x01, 0x00])).unwrap(),
            Value::Integer(256)
        );
        assert_eq!(
            handler.validate(3, Value::bytes(vec![0x00])).unwrap(),
            Value::Integer(-1)
        );
        assert_eq!(handler.validate(2, Value::bytes(Vec::new())).unwrap(), Value::Integer(0));

        let two_63 = handler
            .validate(2, Value::bytes(vec![0x80, 0, 0, 0, 0, 0, 0, 0]))
            .unwrap();
        assert_eq!(two_63, Value::BigInt(BigInt::from(1u64 << 63)));

        // -(1 + (2^63 - 1)) fits i64
        let min = handler
            .validate(3, Value::bytes(vec![0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]))
            .unwrap();
        assert_eq!(min, Value::Integer(i64::MIN));

        assert_eq!(message(handler.validate(2, Value::text("x"))), "Bignum requires a byte string");
    }

    #[test]
    fn test_bignum_rewraps_inner_tags() {
        let handler = BignumTag::new();
        let value = handler
            .validate(2, Value::tagged(99, Value::bytes(vec![5])))
            .unwrap();
        assert_eq!(value, Value::tagged(99, 5));
    }

    #[test]
    fn test_fraction_messages() {
        let decimal = FractionTag::new(true, true);
        let bigfloat = FractionTag::new(false, true);
        assert_eq!(
            message(decimal.validate(4, Value::from(vec![Value::from(1)]))),
            "Decimal fraction requires exactly 2 items"
        );
        assert_eq!(
            message(bigfloat.validate(5, Value::text("x"))),
            "Bigfloat requires exactly 2 items"
        );
        assert_eq!(
            message(decimal.validate(4, pair(1.5, 1))),
            "Exponent is not an integer"
        );
        assert_eq!(
            message(decimal.validate(4, pair(1, "m"))),
            "Mantissa is not an integer"
        );
        let huge = Value::from(BigInt::from(1) << 64usize);
        assert_eq!(message(decimal.validate(4, pair(huge.clone(), 1))), "Exponent is too big");
        assert!(FractionTag::new(true, false).validate(264, pair(huge, 1)).is_ok());
    }

    #[test]
    fn test_fraction_results() {
        let decimal = FractionTag::new(true, true);
        assert_eq!(decimal.validate(4, pair(0, 7)).unwrap(), Value::Integer(7));
        let value = decimal.validate(4, pair(-2, 27315)).unwrap();
        assert_eq!(
            value,
            Value::Decimal(ExtendedDecimal::new(BigInt::from(27315), BigInt::from(-2)))
        );
        let float = FractionTag::new(false, true).validate(5, pair(-1, 3)).unwrap();
        assert!(matches!(float, Value::Float(_)));
        assert_eq!(float.as_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_rational() {
        let handler = RationalTag::new();
        assert_eq!(
            message(handler.validate(30, Value::from(vec![Value::from(1)]))),
            "Rational number requires exactly 2 items"
        );
        assert_eq!(
            message(handler.validate(30, pair(1.0, 2))),
            "Rational number requires integer numerator and denominator"
        );
        assert_eq!(
            message(handler.validate(30, pair(1, 0))),
            "Rational number requires denominator greater than 0"
        );
        assert_eq!(
            message(handler.validate(30, pair(1, -2))),
            "Rational number requires denominator greater than 0"
        );
        assert_eq!(handler.validate(30, pair(6, 1)).unwrap(), Value::Integer(6));
        assert!(matches!(handler.validate(30, pair(1, 3)).unwrap(), Value::Rational(_)));
    }

    #[test]
    fn test_strings_and_uuid() {
        assert_eq!(message(TextTag::new().validate(0, Value::from(1))), "Not a text string");
        assert!(TextTag::new().validate(0, Value::text("2013-03-21T20:04:00Z")).is_ok());
        assert_eq!(message(UriTag::new().validate(32, Value::text("a b"))), "Not a valid URI");
        assert!(UriTag::new().validate(32, Value::text("http://a/b")).is_ok());
        assert_eq!(
            message(UuidTag::new().validate(37, Value::bytes(vec![0; 15]))),
            "UUID must be 16 bytes long"
        );
        assert_eq!(
            UuidTag::new().validate(37, Value::bytes(vec![0; 16])).unwrap().outermost_tag(),
            Some(37)
        );
    }

    #[test]
    fn test_index_and_shareable() {
        let handler = IndexTag::new();
        assert!(handler.validate(25, Value::from(3)).is_ok());
        assert!(handler.validate(29, Value::from(u64::MAX)).is_ok());
        assert_eq!(message(handler.validate(25, Value::from(-1))), "Not a 64-bit unsigned integer");
        assert_eq!(ShareableTag.validate(28, Value::from(1)).unwrap(), Value::from(1));
        assert_eq!(HintTag.validate(22, Value::from(1)).unwrap(), Value::tagged(22, 1));
    }
}
