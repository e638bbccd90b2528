//! Initial-byte tables.
//!
//! The initial byte of every item holds a 3-bit major type and 5-bit
//! additional information: 0-23 literal, 24-27 for 1, 2, 4 or 8 following
//! argument bytes, 28-30 reserved, 31 indefinite length (or break for major
//! type 7).

use crate::model::{SimpleValue, Value};

pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;
pub const MAJOR_SIMPLE: u8 = 7;

pub const INDEFINITE: u8 = 31;
pub const BREAK: u8 = 0xff;

/// Total encoded length of items whose size is fixed by the initial byte.
/// 0 means variable length, -1 an initial byte that is never valid.
pub static EXPECTED_LENGTH: [i8; 256] = build_expected_length();

const fn argument_length(info: u8) -> i8 {
    match info {
        0..=23 => 1,
        24 => 2,
        25 => 3,
        26 => 5,
        27 => 9,
        _ => -1,
    }
}

const fn build_expected_length() -> [i8; 256] {
    let mut table = [0i8; 256];
    let mut byte = 0usize;
    while byte < 256 {
        let major = (byte >> 5) as u8;
        let info = (byte & 0x1f) as u8;
        table[byte] = match major {
            MAJOR_UNSIGNED | MAJOR_NEGATIVE | MAJOR_SIMPLE => argument_length(info),
            MAJOR_BYTES | MAJOR_TEXT => match info {
                0..=23 => 1 + info as i8,
                28..=30 => -1,
                _ => 0,
            },
            MAJOR_ARRAY | MAJOR_MAP => match info {
                0 => 1,
                28..=30 => -1,
                _ => 0,
            },
            _ => match info {
                28..=31 => -1,
                _ => 0,
            },
        };
        byte += 1;
    }
    table
}

/// Item fully described by its initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixedItem {
    Integer(i8),
    EmptyText,
    Simple(u8),
}

static FIXED_ITEMS: [Option<FixedItem>; 256] = build_fixed_items();

const fn build_fixed_items() -> [Option<FixedItem>; 256] {
    let mut table = [None; 256];
    let mut i = 0u8;
    while i < 24 {
        table[i as usize] = Some(FixedItem::Integer(i as i8));
        table[0x20 + i as usize] = Some(FixedItem::Integer(-1 - i as i8));
        table[0xe0 + i as usize] = Some(FixedItem::Simple(i));
        i += 1;
    }
    table[0x60] = Some(FixedItem::EmptyText);
    table
}

/// Allocation-free value for small integers -24..=23, the empty text
/// string and the one-byte simple values.
pub fn fixed_value(initial: u8) -> Option<Value> {
    FIXED_ITEMS[initial as usize].and_then(|item| match item {
        FixedItem::Integer(v) => Some(Value::Integer(i64::from(v))),
        FixedItem::EmptyText => Some(Value::TextString(String::new())),
        FixedItem::Simple(code) => SimpleValue::new(code).ok().map(Value::Simple),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_length() {
        assert_eq!(EXPECTED_LENGTH[0x00], 1);
        assert_eq!(EXPECTED_LENGTH[0x18], 2);
        assert_eq!(EXPECTED_LENGTH[0x1b], 9);
        assert_eq!(EXPECTED_LENGTH[0x1c], -1);
        assert_eq!(EXPECTED_LENGTH[0x1f], -1);
        assert_eq!(EXPECTED_LENGTH[0x43], 4);
        assert_eq!(EXPECTED_LENGTH[0x58], 0);
        assert_eq!(EXPECTED_LENGTH[0x5f], 0);
        assert_eq!(EXPECTED_LENGTH[0x80], 1);
        assert_eq!(EXPECTED_LENGTH[0x82], 0);
        assert_eq!(EXPECTED_LENGTH[0xc2], 0);
        assert_eq!(EXPECTED_LENGTH[0xdf], -1);
        assert_eq!(EXPECTED_LENGTH[0xf9], 3);
        assert_eq!(EXPECTED_LENGTH[0xfb], 9);
        assert_eq!(EXPECTED_LENGTH[BREAK as usize], -1);
    }

    #[test]
    fn test_fixed_values() {
        assert_eq!(fixed_value(0x17), Some(Value::Integer(23)));
        assert_eq!(fixed_value(0x37), Some(Value::Integer(-24)));
        assert_eq!(fixed_value(0x60), Some(Value::text("")));
        assert_eq!(fixed_value(0xf5), Some(Value::TRUE));
        assert_eq!(fixed_value(0xe0).unwrap().as_simple().unwrap().code(), 0);
        assert_eq!(fixed_value(0x18), None);
        assert_eq!(fixed_value(0x40), None);
        assert_eq!(fixed_value(0xf8), None);
    }
}
