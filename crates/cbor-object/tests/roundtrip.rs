//! End-to-end properties of the binary and JSON codecs.

use std::cmp::Ordering;

use cbor_object::{
    decode_from_bytes, encode_value, encode_value_with_options, from_json_str, to_json_string,
    DecodeError, EncodeError, EncodeOptions, ExtendedDecimal, Map, Value,
};
use num_bigint::BigInt;
use proptest::prelude::*;

// =============================================================================
// STRATEGIES
// =============================================================================

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<i128>().prop_map(Value::from),
        ".{0,16}".prop_map(Value::text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::bytes),
        any::<f64>()
            .prop_filter("NaN never equals itself", |v| !v.is_nan())
            .prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(Value::NULL),
        Just(Value::UNDEFINED),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::from),
            prop::collection::vec((inner.clone(), inner), 0..6)
                .prop_map(|entries| entries.into_iter().collect::<Value>()),
        ]
    })
}

/// JSON documents whose numbers come out of the decimal parser.
fn json_document() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        "-?(0|[1-9][0-9]{0,20})(\\.[0-9]{1,6})?([eE][+-]?[0-9]{1,3})?",
        "\"[a-z]{0,8}\"",
        Just("true".to_string()),
        Just("null".to_string()),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| format!("[{}]", items.join(","))),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                let members: Vec<String> = entries
                    .iter()
                    .map(|(key, item)| format!("\"{}\":{}", key, item))
                    .collect();
                format!("{{{}}}", members.join(","))
            }),
        ]
    })
}

// =============================================================================
// BINARY ROUND TRIPS
// =============================================================================

proptest! {
    #[test]
    fn prop_decode_inverts_encode(v in value()) {
        let bytes = encode_value(&v).unwrap();
        prop_assert_eq!(decode_from_bytes(&bytes).unwrap(), v);
    }

    #[test]
    fn prop_parsed_json_survives_binary(text in json_document()) {
        let v = from_json_str(&text).unwrap();
        let bytes = encode_value(&v).unwrap();
        prop_assert_eq!(decode_from_bytes(&bytes).unwrap(), v);
    }

    #[test]
    fn prop_canonical_encoding_is_stable(v in value()) {
        let canonical = EncodeOptions::canonical();
        let first = encode_value_with_options(&v, canonical).unwrap();
        let decoded = decode_from_bytes(&first).unwrap();
        prop_assert_eq!(encode_value_with_options(&decoded, canonical).unwrap(), first);
    }

    #[test]
    fn prop_compare_is_antisymmetric(a in value(), b in value()) {
        prop_assert_eq!(a.compare(&b), b.compare(&a).reverse());
    }
}

#[test]
fn test_integer_head_lengths() {
    let cases: [(i128, usize); 13] = [
        (0, 1),
        (23, 1),
        (24, 2),
        (255, 2),
        (256, 3),
        (65535, 3),
        (65536, 5),
        (4_294_967_295, 5),
        (4_294_967_296, 9),
        (i64::MAX as i128, 9),
        (-1, 1),
        (-24, 1),
        (-25, 2),
    ];
    for (n, len) in cases {
        let bytes = encode_value(&Value::from(n)).unwrap();
        assert_eq!(bytes.len(), len, "{}", n);
        assert_eq!(decode_from_bytes(&bytes).unwrap(), Value::from(n));
    }
}

#[test]
fn test_two_to_the_63_uses_bignum_tag() {
    let n = BigInt::from(1u64 << 63);
    let bytes = encode_value(&Value::from(n.clone())).unwrap();
    assert_eq!(&bytes[..2], &[0xc2, 0x48]);
    assert_eq!(decode_from_bytes(&bytes).unwrap(), Value::BigInt(n));
}

#[test]
fn test_small_array_bytes() {
    let value = decode_from_bytes(&[0x82, 0x01, 0x02]).unwrap();
    assert_eq!(value, Value::from(vec![Value::from(1), Value::from(2)]));
    assert_eq!(encode_value(&value).unwrap(), vec![0x82, 0x01, 0x02]);
    assert_eq!(to_json_string(&value).unwrap(), "[1,2]");
    assert_eq!(from_json_str("[1,2]").unwrap(), value);
}

// =============================================================================
// TAG VALIDATION
// =============================================================================

#[test]
fn test_rational_tag_rejections() {
    // 30([1, 0])
    let err = decode_from_bytes(&[0xd8, 0x1e, 0x82, 0x01, 0x00]).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidTag { tag: 30, .. }));
    // 30([1])
    let err = decode_from_bytes(&[0xd8, 0x1e, 0x81, 0x01]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InvalidTag { tag: 30, .. } | DecodeError::TagFilter { tag: 30, .. }
    ));
    // 30([1, 3]) decodes
    let third = decode_from_bytes(&[0xd8, 0x1e, 0x82, 0x01, 0x03]).unwrap();
    assert!(matches!(third, Value::Rational(_)));
}

#[test]
fn test_uuid_tag_rejections() {
    let mut short = vec![0xd8, 0x25, 0x4f];
    short.extend_from_slice(&[0u8; 15]);
    let err = decode_from_bytes(&short).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidTag { tag: 37, .. }));

    // 37("x")
    let err = decode_from_bytes(&[0xd8, 0x25, 0x61, 0x78]).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InvalidTag { tag: 37, .. } | DecodeError::TagFilter { tag: 37, .. }
    ));
}

// =============================================================================
// JSON
// =============================================================================

#[test]
fn test_json_decimal_fidelity() {
    let value = from_json_str("1.50").unwrap();
    assert_eq!(
        value,
        Value::Decimal(ExtendedDecimal::new(BigInt::from(150), BigInt::from(-2)))
    );
    assert_eq!(to_json_string(&value).unwrap(), "1.50");

    let huge = from_json_str("1e400").unwrap();
    assert_eq!(
        huge.as_extended_decimal().unwrap(),
        ExtendedDecimal::new(BigInt::from(1), BigInt::from(400))
    );
    let bytes = encode_value(&huge).unwrap();
    assert_eq!(bytes[0], 0xc4);
    assert_eq!(decode_from_bytes(&bytes).unwrap(), huge);
}

#[test]
fn test_json_numbers_survive_binary() {
    for (text, expected) in [
        ("1e0", Value::from(1)),
        ("1.0e1", Value::from(10)),
        ("-0.0", Value::from(-0.0f64)),
    ] {
        let parsed = from_json_str(text).unwrap();
        assert_eq!(parsed, expected, "{}", text);
        let bytes = encode_value(&parsed).unwrap();
        assert_eq!(decode_from_bytes(&bytes).unwrap(), parsed, "{}", text);
    }
    let parsed = from_json_str("-0.0").unwrap();
    assert!(matches!(parsed, Value::Double(v) if v == 0.0 && v.is_sign_negative()));
}

#[test]
fn test_json_surrogates() {
    let pair = from_json_str(r#""\ud83d\ude00""#).unwrap();
    assert_eq!(pair.as_text().unwrap(), "\u{1f600}");
    assert!(matches!(
        from_json_str(r#""\ud83d""#),
        Err(DecodeError::UnpairedSurrogate { .. })
    ));
    assert!(matches!(
        from_json_str(r#""\ude00x""#),
        Err(DecodeError::UnpairedSurrogate { .. })
    ));
}

// =============================================================================
// ORDERING AND CYCLES
// =============================================================================

#[test]
fn test_comparison_sequence() {
    let ordered = [
        Value::UNDEFINED,
        Value::NULL,
        Value::FALSE,
        Value::TRUE,
        Value::from(-1),
        Value::from(0.5f64),
        Value::from(1),
        Value::from(BigInt::from(1) << 80usize),
        Value::from(f64::NAN),
        Value::bytes(vec![0u8]),
        Value::text("a"),
        Value::from(vec![Value::from(1)]),
        Value::Map(Map::new()),
        Value::simple(99).unwrap(),
    ];
    for window in ordered.windows(2) {
        assert_eq!(window[0].compare(&window[1]), Ordering::Less, "{} < {}", window[0], window[1]);
    }
}

#[test]
fn test_circular_reference_is_rejected() {
    let map = Map::new();
    map.insert("self", Value::Map(map.clone()));
    let value = Value::Map(map.clone());
    assert!(matches!(encode_value(&value), Err(EncodeError::CircularReference)));
    assert!(matches!(to_json_string(&value), Err(EncodeError::CircularReference)));
    map.clear();
}

#[test]
fn test_shared_map_key_cycles_are_rejected() {
    // 28({29(0): 1})
    assert!(matches!(
        decode_from_bytes(&[0xd8, 0x1c, 0xa1, 0xd8, 0x1d, 0x00, 0x01]),
        Err(DecodeError::CyclicKey { .. })
    ));
    // {28([29(0)]): 1}
    assert!(matches!(
        decode_from_bytes(&[0xa1, 0xd8, 0x1c, 0x81, 0xd8, 0x1d, 0x00, 0x01]),
        Err(DecodeError::CyclicKey { .. })
    ));
}

#[test]
fn test_shared_self_reference_resolves_to_same_handle() {
    // 28([29(0)])
    let value = decode_from_bytes(&[0xd8, 0x1c, 0x81, 0xd8, 0x1d, 0x00]).unwrap();
    let outer = value.as_array().unwrap().clone();
    let inner = outer.get(0).unwrap();
    assert!(inner.as_array().unwrap().ptr_eq(&outer));
    assert!(matches!(encode_value(&value), Err(EncodeError::CircularReference)));
    outer.clear();
}
