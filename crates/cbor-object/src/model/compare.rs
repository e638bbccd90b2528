//! Total ordering, equality and hashing for [`Value`].

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::model::{Array, Map, Value};

// Order of kind classes when two values are not comparable within a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Fixed(u8),
    Number,
    ByteString,
    TextString,
    Array,
    Map,
    Simple,
}

fn class_of(value: &Value) -> Class {
    match value {
        Value::Simple(s) => match s.fixed_rank() {
            Some(rank) => Class::Fixed(rank),
            None => Class::Simple,
        },
        Value::ByteString(_) => Class::ByteString,
        Value::TextString(_) => Class::TextString,
        Value::Array(_) => Class::Array,
        Value::Map(_) => Class::Map,
        _ => Class::Number,
    }
}

impl Value {
    /// Total order over values.
    ///
    /// undefined < null < false < true, then numbers by mathematical value
    /// (NaN last), byte strings, text strings, arrays, maps and the remaining
    /// simple values. Values equal apart from their tags order by tag chain,
    /// untagged first.
    pub fn compare(&self, other: &Value) -> Ordering {
        compare_untagged(self.untagged(), other.untagged())
            .then_with(|| compare_tag_chains(self, other))
    }

    /// Like [`Value::compare`], with absent values ordered first.
    pub fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.compare(b),
        }
    }
}

fn compare_untagged(a: &Value, b: &Value) -> Ordering {
    let (ca, cb) = (class_of(a), class_of(b));
    if ca != cb {
        return ca.cmp(&cb);
    }
    match (a, b) {
        (Value::ByteString(x), Value::ByteString(y)) => x.cmp(y),
        // UTF-8 byte order is code point order.
        (Value::TextString(x), Value::TextString(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => compare_arrays(x, y),
        (Value::Map(x), Value::Map(y)) => compare_maps(x, y),
        (Value::Simple(x), Value::Simple(y)) => x.code().cmp(&y.code()),
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.compare(&y),
            _ => Ordering::Equal,
        },
    }
}

fn compare_arrays(a: &Array, b: &Array) -> Ordering {
    if a.ptr_eq(b) {
        return Ordering::Equal;
    }
    compare_slices(&a.borrow(), &b.borrow())
}

fn compare_slices(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ordering = x.compare(y);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}

fn sorted_keys(map: &Map) -> Vec<Value> {
    let mut keys = map.keys();
    keys.sort_by(Value::compare);
    keys
}

fn compare_maps(a: &Map, b: &Map) -> Ordering {
    if a.ptr_eq(b) {
        return Ordering::Equal;
    }
    let (keys_a, keys_b) = (sorted_keys(a), sorted_keys(b));
    let by_keys = compare_slices(&keys_a, &keys_b);
    if by_keys != Ordering::Equal {
        return by_keys;
    }
    let (a, b) = (a.borrow(), b.borrow());
    for key in &keys_a {
        let ordering = Value::compare_optional(a.get(key), b.get(key));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_tag_chains(a: &Value, b: &Value) -> Ordering {
    let (mut a, mut b) = (a, b);
    loop {
        match (a, b) {
            (Value::Tagged { tag: ta, inner: ia }, Value::Tagged { tag: tb, inner: ib }) => {
                if ta != tb {
                    return ta.cmp(tb);
                }
                a = ia;
                b = ib;
            }
            (Value::Tagged { .. }, _) => return Ordering::Greater,
            (_, Value::Tagged { .. }) => return Ordering::Less,
            _ => return Ordering::Equal,
        }
    }
}

// =============================================================================
// EQUALITY
// =============================================================================

fn f64_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

// Bits for hashing, consistent with `f64_eq`.
fn f64_hash_bits(v: f64) -> u64 {
    if v.is_nan() {
        f64::NAN.to_bits()
    } else if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::ByteString(a), Value::ByteString(b)) => a == b,
            (Value::TextString(a), Value::TextString(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b) || maps_equal(a, b),
            (Value::Simple(a), Value::Simple(b)) => a == b,
            (Value::Single(a), Value::Single(b)) => f64_eq(f64::from(*a), f64::from(*b)),
            (Value::Double(a), Value::Double(b)) => f64_eq(*a, *b),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (Value::Tagged { tag: ta, inner: ia }, Value::Tagged { tag: tb, inner: ib }) => {
                ta == tb && ia == ib
            }
            _ => false,
        }
    }
}

fn maps_equal(a: &Map, b: &Map) -> bool {
    let (a, b) = (a.borrow(), b.borrow());
    a.len() == b.len()
        && a
            .iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| other == value))
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::ByteString(v) => v.hash(state),
            Value::TextString(v) => v.hash(state),
            Value::Array(a) => {
                let items = a.borrow();
                items.len().hash(state);
                for item in items.iter() {
                    item.hash(state);
                }
            }
            Value::Map(m) => {
                // Entry order does not take part in equality.
                let entries = m.borrow();
                let mut sum: u64 = 0;
                for (key, value) in entries.iter() {
                    let mut hasher = FxHasher::default();
                    key.hash(&mut hasher);
                    value.hash(&mut hasher);
                    sum = sum.wrapping_add(hasher.finish());
                }
                entries.len().hash(state);
                sum.hash(state);
            }
            Value::Simple(v) => v.hash(state),
            Value::Single(v) => f64_hash_bits(f64::from(*v)).hash(state),
            Value::Double(v) => f64_hash_bits(*v).hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::Float(v) => v.hash(state),
            Value::Rational(v) => v.hash(state),
            Value::Tagged { tag, inner } => {
                tag.hash(state);
                inner.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::ExtendedDecimal;
    use num_bigint::BigInt;
    use rustc_hash::FxHashSet;

    fn decimal(mantissa: i64, exponent: i64) -> Value {
        Value::Decimal(ExtendedDecimal::new(
            BigInt::from(mantissa),
            BigInt::from(exponent),
        ))
    }

    #[test]
    fn test_canonical_sequence_is_sorted() {
        let sequence = [
            Value::UNDEFINED,
            Value::NULL,
            Value::FALSE,
            Value::TRUE,
            Value::from(0),
            Value::Double(1.5),
            Value::text("a"),
            Value::new_array(),
            Value::new_map(),
        ];
        for (i, a) in sequence.iter().enumerate() {
            for (j, b) in sequence.iter().enumerate() {
                assert_eq!(a.compare(b), i.cmp(&j), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_numbers_compare_by_value() {
        assert_eq!(decimal(15, -1).compare(&Value::Double(1.5)), Ordering::Equal);
        assert_eq!(decimal(150, -2).compare(&decimal(15, -1)), Ordering::Equal);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::from(i64::MAX)), Ordering::Greater);
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Single(f32::NAN)), Ordering::Equal);
        assert_eq!(Value::from(-1).compare(&Value::Single(-0.5)), Ordering::Less);
    }

    #[test]
    fn test_strings_and_arrays() {
        assert_eq!(Value::bytes(vec![1, 2]).compare(&Value::bytes(vec![1, 2, 0])), Ordering::Less);
        assert_eq!(Value::bytes(vec![0xff]).compare(&Value::bytes(vec![1, 2])), Ordering::Greater);
        assert_eq!(Value::text("\u{e9}").compare(&Value::text("z")), Ordering::Greater);
        let short: Value = vec![Value::from(1)].into();
        let long: Value = vec![Value::from(1), Value::from(0)].into();
        assert_eq!(short.compare(&long), Ordering::Less);
    }

    #[test]
    fn test_maps_compare_by_sorted_keys() {
        let a = Value::new_map();
        a.as_map().unwrap().insert("b", 1);
        a.as_map().unwrap().insert("a", 2);
        let b = Value::new_map();
        b.as_map().unwrap().insert("a", 2);
        b.as_map().unwrap().insert("b", 1);
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_eq!(a, b);

        b.as_map().unwrap().insert("b", 3);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_ne!(a, b);
    }

    #[test]
    fn test_tags_break_ties() {
        let plain = Value::from(1);
        let tagged = Value::tagged(5, 1);
        let other = Value::tagged(6, 1);
        assert_eq!(plain.compare(&tagged), Ordering::Less);
        assert_eq!(tagged.compare(&other), Ordering::Less);
        assert_eq!(Value::tagged(9, 0).compare(&plain), Ordering::Less);
        assert_ne!(plain, tagged);
    }

    #[test]
    fn test_equality_is_structural() {
        assert_ne!(decimal(150, -2), decimal(15, -1));
        assert_ne!(Value::from(1), Value::Double(1.0));
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_eq!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::Single(1.0), Value::Double(1.0));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let a = Value::new_map();
        a.as_map().unwrap().insert("x", 1);
        a.as_map().unwrap().insert("y", 2);
        let b = Value::new_map();
        b.as_map().unwrap().insert("y", 2);
        b.as_map().unwrap().insert("x", 1);

        let mut set = FxHashSet::default();
        set.insert(a);
        assert!(set.contains(&b));

        set.insert(Value::Double(0.0));
        assert!(set.contains(&Value::Double(-0.0)));
    }
}
