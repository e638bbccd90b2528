//! JSON-grammar numeric literal parsing.

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

use super::ExtendedDecimal;
use crate::model::Value;

// Largest power of ten whose digits fit a u64 chunk.
const CHUNK_DIGITS: u32 = 18;
const CHUNK_SCALE: u64 = 1_000_000_000_000_000_000;

/// Accumulates decimal digits in a machine word and spills into a
/// `BigUint` in 18-digit chunks once the word would overflow.
#[derive(Debug, Default)]
struct DigitAccumulator {
    big: Option<BigUint>,
    chunk: u64,
    chunk_digits: u32,
}

impl DigitAccumulator {
    fn push(&mut self, digit: u8) {
        self.chunk = self.chunk * 10 + u64::from(digit);
        self.chunk_digits += 1;
        if self.chunk_digits == CHUNK_DIGITS {
            let spilled = match self.big.take() {
                Some(big) => big * CHUNK_SCALE + self.chunk,
                None => BigUint::from(self.chunk),
            };
            self.big = Some(spilled);
            self.chunk = 0;
            self.chunk_digits = 0;
        }
    }

    fn finish(self) -> BigUint {
        match self.big {
            Some(big) => big * 10u64.pow(self.chunk_digits) + self.chunk,
            None => BigUint::from(self.chunk),
        }
    }

    /// Value as `u64` when no chunk has spilled.
    fn small(&self) -> Option<u64> {
        if self.big.is_none() { Some(self.chunk) } else { None }
    }
}

/// Parses a numeric literal in JSON grammar
/// (`-? (0 | [1-9][0-9]*) (\.[0-9]+)? ([eE][+-]?[0-9]+)?`).
///
/// Literals without a fraction or exponent become integers (`Integer`, or
/// `BigInt` when out of `i64` range); the rest become exact decimals with
/// `exponent = exp - fraction_digits`. Returns `None` for malformed input.
pub fn parse_number_literal(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let negative = bytes.first() == Some(&b'-');
    if negative {
        pos += 1;
    }

    let mut mantissa = DigitAccumulator::default();
    match bytes.get(pos) {
        Some(b'0') => {
            mantissa.push(0);
            pos += 1;
        }
        Some(b'1'..=b'9') => {
            while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
                mantissa.push(b - b'0');
                pos += 1;
            }
        }
        _ => return None,
    }

    let mut fraction_digits: u64 = 0;
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let start = pos;
        while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
            mantissa.push(b - b'0');
            pos += 1;
        }
        if pos == start {
            return None;
        }
        fraction_digits = (pos - start) as u64;
    }

    let mut exponent = BigInt::zero();
    let mut has_exponent = false;
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        has_exponent = true;
        pos += 1;
        let exp_negative = match bytes.get(pos) {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let start = pos;
        let mut digits = DigitAccumulator::default();
        while let Some(&b) = bytes.get(pos).filter(|b| b.is_ascii_digit()) {
            digits.push(b - b'0');
            pos += 1;
        }
        if pos == start {
            return None;
        }
        exponent = BigInt::from(digits.finish());
        if exp_negative {
            exponent = -exponent;
        }
    }

    if pos != bytes.len() {
        return None;
    }

    if fraction_digits == 0 && !has_exponent {
        if let Some(small) = mantissa.small() {
            if negative {
                // -(2^63) is the only magnitude past i64::MAX that fits
                if let Some(v) = i64::try_from(small).ok().map(|v| -v) {
                    return Some(Value::Integer(v));
                }
                if small == 1u64 << 63 {
                    return Some(Value::Integer(i64::MIN));
                }
            } else if let Ok(v) = i64::try_from(small) {
                return Some(Value::Integer(v));
            }
        }
        let magnitude = BigInt::from(mantissa.finish());
        return Some(Value::from(if negative { -magnitude } else { magnitude }));
    }

    let exponent = exponent - BigInt::from(fraction_digits);
    Some(Value::from(ExtendedDecimal::from_parts(
        negative,
        mantissa.finish(),
        exponent,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(value: Value) -> ExtendedDecimal {
        match value {
            Value::Decimal(d) => d,
            other => panic!("expected decimal, got {:?}", other),
        }
    }

    #[test]
    fn test_integers() {
        assert_eq!(parse_number_literal("0"), Some(Value::Integer(0)));
        assert_eq!(parse_number_literal("-0"), Some(Value::Integer(0)));
        assert_eq!(parse_number_literal("123"), Some(Value::Integer(123)));
        assert_eq!(
            parse_number_literal("-9223372036854775808"),
            Some(Value::Integer(i64::MIN))
        );
        assert_eq!(
            parse_number_literal("9223372036854775808"),
            Some(Value::BigInt(BigInt::from(1u64 << 63)))
        );
        let long = "123456789012345678901234567890";
        assert_eq!(parse_number_literal(long).map(|v| v.to_string()), Some(long.to_string()));
    }

    #[test]
    fn test_decimals_keep_scale() {
        let d = decimal(parse_number_literal("1.50").unwrap());
        assert_eq!(d.mantissa(), BigInt::from(150));
        assert_eq!(d.exponent(), &BigInt::from(-2));

        let d = decimal(parse_number_literal("1e400").unwrap());
        assert_eq!(d.mantissa(), BigInt::from(1));
        assert_eq!(d.exponent(), &BigInt::from(400));

        let d = decimal(parse_number_literal("-2.5E-3").unwrap());
        assert_eq!(d.mantissa(), BigInt::from(-25));
        assert_eq!(d.exponent(), &BigInt::from(-4));

    }

    #[test]
    fn test_results_are_normalized() {
        assert_eq!(parse_number_literal("1e0"), Some(Value::Integer(1)));
        assert_eq!(parse_number_literal("1.0e1"), Some(Value::Integer(10)));
        assert_eq!(parse_number_literal("-12E0"), Some(Value::Integer(-12)));
        match parse_number_literal("-0.0") {
            Some(Value::Double(v)) => assert!(v == 0.0 && v.is_sign_negative()),
            other => panic!("expected negative zero double, got {:?}", other),
        }
        assert!(matches!(parse_number_literal("25E-1"), Some(Value::Decimal(_))));
    }

    #[test]
    fn test_huge_exponent() {
        let d = decimal(parse_number_literal("1e123456789012345678901234567890").unwrap());
        assert!(d.exponent() > &BigInt::from(u64::MAX));
    }

    #[test]
    fn test_malformed() {
        for text in ["", "-", "01", "1.", ".5", "1e", "1e+", "+1", "1.2.3", "0x10", "1 ", "NaN"] {
            assert_eq!(parse_number_literal(text), None, "{:?}", text);
        }
    }
}
