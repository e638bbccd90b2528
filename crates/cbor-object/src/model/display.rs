//! Diagnostic notation (RFC 7049 section 6).

use std::fmt::{self, Write as _};

use data_encoding::HEXLOWER;

use crate::limits::{STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::model::Value;

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ancestors = Vec::new();
        write_diagnostic(self, f, &mut ancestors)
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value < 0.0 { "-Infinity" } else { "Infinity" })
    } else {
        write!(f, "{:?}", value)
    }
}

pub(crate) fn write_escaped_text<W: fmt::Write>(out: &mut W, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            '\u{08}' => out.write_str("\\b")?,
            '\u{0c}' => out.write_str("\\f")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

fn write_diagnostic(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    ancestors: &mut Vec<usize>,
) -> fmt::Result {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || {
        write_item(value, f, ancestors)
    })
}

// Containers already on the path are printed as `...`.
fn write_item(
    value: &Value,
    f: &mut fmt::Formatter<'_>,
    ancestors: &mut Vec<usize>,
) -> fmt::Result {
    match value {
        Value::Integer(v) => write!(f, "{}", v),
        Value::BigInt(v) => write!(f, "{}", v),
        Value::ByteString(bytes) => write!(f, "h'{}'", HEXLOWER.encode(bytes)),
        Value::TextString(text) => write_escaped_text(f, text),
        Value::Array(array) => {
            let id = array.identity();
            if ancestors.contains(&id) {
                return f.write_str("...");
            }
            ancestors.push(id);
            f.write_char('[')?;
            for (i, item) in array.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_diagnostic(item, f, ancestors)?;
            }
            ancestors.pop();
            f.write_char(']')
        }
        Value::Map(map) => {
            let id = map.identity();
            if ancestors.contains(&id) {
                return f.write_str("...");
            }
            ancestors.push(id);
            f.write_char('{')?;
            for (i, (key, item)) in map.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_diagnostic(key, f, ancestors)?;
                f.write_str(": ")?;
                write_diagnostic(item, f, ancestors)?;
            }
            ancestors.pop();
            f.write_char('}')
        }
        Value::Simple(s) => write!(f, "{}", s),
        Value::Single(v) => write_float(f, f64::from(*v)),
        Value::Double(v) => write_float(f, *v),
        Value::Decimal(v) => write!(f, "{}", v),
        Value::Float(v) => write!(f, "{}", v),
        Value::Rational(v) => write!(f, "{}", v),
        Value::Tagged { tag, inner } => {
            write!(f, "{}(", tag)?;
            write_diagnostic(inner, f, ancestors)?;
            f.write_char(')')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::{ExtendedDecimal, ExtendedRational};
    use num_bigint::BigInt;

    #[test]
    fn test_diagnostic_notation() {
        let array: Value = vec![
            Value::from(1),
            Value::from(-2),
            Value::bytes(vec![0x01, 0xab]),
            Value::text("a\"b\n"),
        ]
        .into();
        assert_eq!(array.to_string(), r#"[1, -2, h'01ab', "a\"b\n"]"#);

        let map = Value::new_map();
        map.as_map().unwrap().insert("k", Value::TRUE);
        map.as_map().unwrap().insert(1, Value::UNDEFINED);
        assert_eq!(map.to_string(), r#"{"k": true, 1: undefined}"#);

        assert_eq!(Value::tagged(32, "http://x").to_string(), r#"32("http://x")"#);
        assert_eq!(Value::simple(99).unwrap().to_string(), "simple(99)");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(Value::Double(1.5).to_string(), "1.5");
        assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Single(f32::NAN).to_string(), "NaN");
        let decimal = ExtendedDecimal::new(BigInt::from(1), BigInt::from(400));
        assert_eq!(Value::Decimal(decimal).to_string(), "1E+400");
        let third = ExtendedRational::new(BigInt::from(1), BigInt::from(3)).unwrap();
        assert_eq!(Value::Rational(third).to_string(), "1/3");
        let big: BigInt = BigInt::from(u64::MAX) * 4u32;
        assert_eq!(Value::from(big.clone()).to_string(), big.to_string());
    }

    #[test]
    fn test_self_reference_is_elided() {
        let array = Value::new_array();
        array.as_array().unwrap().push(1);
        array.as_array().unwrap().push(array.clone());
        assert_eq!(array.to_string(), "[1, ...]");
    }
}
