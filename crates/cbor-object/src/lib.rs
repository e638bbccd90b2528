//! CBOR (RFC 7049) value model with binary and JSON codecs.
//!
//! This crate decodes CBOR bytes into a generic [`Value`] tree, encodes
//! values back to bytes, and converts values to and from JSON text.
//!
//! # Overview
//!
//! - **Numeric tower**: integers, bignums, half/single/double floats,
//!   arbitrary-precision decimal fractions, bigfloats and rationals, all
//!   behind the [`Numeric`] interface and compared by mathematical value
//! - **Tags**: a [`TagRegistry`] maps tag numbers to validators that check
//!   and normalize payloads (`2(h'0100')` decodes to the integer 256)
//! - **References**: shared values (tags 28/29) and string references
//!   (tags 256/25) are resolved while decoding
//!
//! # Quick Start
//!
//! ```rust
//! use cbor_object::{decode_from_bytes, encode_value, from_json_str, to_json_string, Value};
//!
//! let value = decode_from_bytes(&[0x82, 0x01, 0x02]).unwrap();
//! assert_eq!(value, Value::from(vec![Value::from(1), Value::from(2)]));
//! assert_eq!(to_json_string(&value).unwrap(), "[1,2]");
//!
//! let parsed = from_json_str("[1, 2]").unwrap();
//! assert_eq!(encode_value(&parsed).unwrap(), vec![0x82, 0x01, 0x02]);
//! ```
//!
//! # Modules
//!
//! - [`model`]: The generic value, containers and conversions
//! - [`number`]: Extended numeric types and the [`Numeric`] interface
//! - [`tags`]: Tag registry, built-in validators and type filters
//! - [`codec`]: Binary encoding/decoding
//! - [`json`]: JSON parsing and writing
//! - [`error`]: Error types
//! - [`limits`]: Limits for decoding untrusted input
//!
//! # Security
//!
//! The decoder is designed to safely handle untrusted input:
//! - Nesting of arrays, maps and tags is bounded
//! - Declared lengths never allocate more than the input actually holds
//! - Invalid data is rejected with descriptive errors
//!
//! # Threads
//!
//! Arrays and maps are shared handles (`Rc<RefCell<..>>`), so a [`Value`]
//! stays on the thread that built it. The registries are `Send + Sync`.

pub mod codec;
pub mod error;
pub mod json;
pub mod limits;
pub mod model;
pub mod number;
pub mod tags;

// Re-export commonly used types at crate root
pub use codec::{
    decode_from_bytes, decode_from_bytes_with, encode_value, encode_value_with_options,
    read_value, read_value_with, write_value, write_value_with_options, DecodeOptions, Decoder,
    EncodeOptions, Encoder,
};
pub use error::{ArgumentError, ConversionError, DecodeError, EncodeError, RangeError, TypeError};
pub use json::{
    from_json_reader, from_json_reader_with, from_json_str, from_json_str_with, to_json_bytes,
    to_json_string, write_json, JsonOptions,
};
pub use model::{Array, ItemKind, Map, SimpleValue, Value};
pub use number::{
    ExtendedDecimal, ExtendedFloat, ExtendedRational, NumberRef, Numeric, Sign,
};
pub use tags::{default_registry, TagHandler, TagRegistry, TypeFilter};
