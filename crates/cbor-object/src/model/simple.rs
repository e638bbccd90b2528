//! Simple values (major type 7) and the item kind discriminant.

use std::fmt;

use crate::error::ArgumentError;

/// A CBOR simple value. Codes 24 through 31 are reserved and never held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleValue(u8);

impl SimpleValue {
    pub const FALSE: SimpleValue = SimpleValue(20);
    pub const TRUE: SimpleValue = SimpleValue(21);
    pub const NULL: SimpleValue = SimpleValue(22);
    pub const UNDEFINED: SimpleValue = SimpleValue(23);

    /// Creates a simple value, rejecting the reserved codes 24..=31.
    pub fn new(code: u8) -> Result<Self, ArgumentError> {
        if (24..32).contains(&code) {
            return Err(ArgumentError::ReservedSimpleValue { value: code });
        }
        Ok(SimpleValue(code))
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_bool(self) -> bool {
        self == Self::FALSE || self == Self::TRUE
    }

    /// Rank among the four fixed values: undefined 0, null 1, false 2,
    /// true 3. Other codes have no rank.
    pub(crate) fn fixed_rank(self) -> Option<u8> {
        match self.0 {
            23 => Some(0),
            22 => Some(1),
            20 => Some(2),
            21 => Some(3),
            _ => None,
        }
    }
}

impl From<bool> for SimpleValue {
    fn from(value: bool) -> Self {
        if value { Self::TRUE } else { Self::FALSE }
    }
}

impl fmt::Display for SimpleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            20 => f.write_str("false"),
            21 => f.write_str("true"),
            22 => f.write_str("null"),
            23 => f.write_str("undefined"),
            code => write!(f, "simple({})", code),
        }
    }
}

/// Kind of an untagged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Integer,
    BigInt,
    ByteString,
    TextString,
    Array,
    Map,
    Simple,
    Single,
    Double,
    Decimal,
    Float,
    Rational,
}

impl ItemKind {
    pub fn is_number(self) -> bool {
        matches!(
            self,
            ItemKind::Integer
                | ItemKind::BigInt
                | ItemKind::Single
                | ItemKind::Double
                | ItemKind::Decimal
                | ItemKind::Float
                | ItemKind::Rational
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemKind::Integer => "integer",
            ItemKind::BigInt => "big integer",
            ItemKind::ByteString => "byte string",
            ItemKind::TextString => "text string",
            ItemKind::Array => "array",
            ItemKind::Map => "map",
            ItemKind::Simple => "simple value",
            ItemKind::Single => "single-precision float",
            ItemKind::Double => "double-precision float",
            ItemKind::Decimal => "decimal fraction",
            ItemKind::Float => "bigfloat",
            ItemKind::Rational => "rational number",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_codes_rejected() {
        for code in 24..32u8 {
            assert!(matches!(
                SimpleValue::new(code),
                Err(ArgumentError::ReservedSimpleValue { value }) if value == code
            ));
        }
        assert_eq!(SimpleValue::new(23).unwrap(), SimpleValue::UNDEFINED);
        assert_eq!(SimpleValue::new(32).unwrap().code(), 32);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimpleValue::from(true).to_string(), "true");
        assert_eq!(SimpleValue::new(99).unwrap().to_string(), "simple(99)");
        assert_eq!(ItemKind::TextString.to_string(), "text string");
    }
}
