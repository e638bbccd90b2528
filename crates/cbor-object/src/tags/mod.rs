//! Tag registry: validation and normalization of tagged items.
//!
//! Each registered tag number maps to a [`TagHandler`] providing a
//! [`TypeFilter`] (enforced by the binary reader while the payload is read)
//! and a validator that checks the payload and returns the final value.
//! Validators may drop their own tag, so `2(h'0100')` becomes the integer
//! 256.
//!
//! # Built-in tags
//!
//! | tag | payload | result |
//! |---|---|---|
//! | 0, 33-36 | text string | unchanged |
//! | 2 / 3 | byte string | integer |
//! | 4 / 5, 264 / 265 | `[exponent, mantissa]` | decimal / binary float |
//! | 21-23 | any | unchanged |
//! | 25 / 29 | unsigned integer | unchanged |
//! | 28 | any | payload |
//! | 30 | `[numerator, denominator]` | rational |
//! | 32 | IRI reference | unchanged |
//! | 37 | 16 bytes | unchanged |

mod filter;
mod handlers;
mod iri;

pub use filter::{ANY_FILTER, AllowedTags, ArrayRule, TypeFilter};
pub use iri::is_valid_iri;

use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, trace};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::DecodeError;
use crate::model::Value;

use handlers::{
    BignumTag, FractionTag, HintTag, IndexTag, RationalTag, ShareableTag, TextTag, UriTag,
    UuidTag,
};

pub const TAG_DATE_TIME: u64 = 0;
pub const TAG_POSITIVE_BIGNUM: u64 = 2;
pub const TAG_NEGATIVE_BIGNUM: u64 = 3;
pub const TAG_DECIMAL_FRACTION: u64 = 4;
pub const TAG_BIGFLOAT: u64 = 5;
pub const TAG_EXPECT_BASE64URL: u64 = 21;
pub const TAG_EXPECT_BASE64: u64 = 22;
pub const TAG_EXPECT_BASE16: u64 = 23;
pub const TAG_STRING_REF: u64 = 25;
pub const TAG_SHAREABLE: u64 = 28;
pub const TAG_SHARED_REF: u64 = 29;
pub const TAG_RATIONAL: u64 = 30;
pub const TAG_URI: u64 = 32;
pub const TAG_UUID: u64 = crate::model::TAG_UUID;
pub const TAG_STRING_REF_NAMESPACE: u64 = 256;
pub const TAG_EXTENDED_DECIMAL: u64 = 264;
pub const TAG_EXTENDED_BIGFLOAT: u64 = 265;

/// Validator for one or more tag numbers.
pub trait TagHandler: Send + Sync {
    /// Shape the payload must have. The binary reader enforces it while
    /// reading.
    fn filter(&self) -> &TypeFilter;

    /// Checks the payload of `tag` and returns the resulting value, usually
    /// `Value::tagged(tag, payload)` or a normalized replacement.
    fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError>;
}

/// Table of tag handlers.
///
/// Registration takes `&self`, so a shared registry can be extended while
/// decoders hold references to it.
#[derive(Default)]
pub struct TagRegistry {
    handlers: RwLock<FxHashMap<u64, Arc<dyn TagHandler>>>,
}

impl std::fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<u64> = self.handlers.read().keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("TagRegistry").field("tags", &tags).finish()
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: TagRegistry = TagRegistry::with_builtins();
}

/// Process-wide registry seeded with the built-in tags.
pub fn default_registry() -> &'static TagRegistry {
    &DEFAULT_REGISTRY
}

impl TagRegistry {
    /// An empty registry. Every tag is kept without validation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in tags.
    pub fn with_builtins() -> Self {
        let registry = TagRegistry::new();
        {
            let mut handlers = registry.handlers.write();
            let text: Arc<dyn TagHandler> = Arc::new(TextTag::new());
            for tag in [TAG_DATE_TIME, 33, 34, 35, 36] {
                handlers.insert(tag, Arc::clone(&text));
            }
            let bignum: Arc<dyn TagHandler> = Arc::new(BignumTag::new());
            handlers.insert(TAG_POSITIVE_BIGNUM, Arc::clone(&bignum));
            handlers.insert(TAG_NEGATIVE_BIGNUM, bignum);
            handlers.insert(TAG_DECIMAL_FRACTION, Arc::new(FractionTag::new(true, true)));
            handlers.insert(TAG_BIGFLOAT, Arc::new(FractionTag::new(false, true)));
            handlers.insert(TAG_EXTENDED_DECIMAL, Arc::new(FractionTag::new(true, false)));
            handlers.insert(TAG_EXTENDED_BIGFLOAT, Arc::new(FractionTag::new(false, false)));
            let hint: Arc<dyn TagHandler> = Arc::new(HintTag);
            for tag in [TAG_EXPECT_BASE64URL, TAG_EXPECT_BASE64, TAG_EXPECT_BASE16] {
                handlers.insert(tag, Arc::clone(&hint));
            }
            let index: Arc<dyn TagHandler> = Arc::new(IndexTag::new());
            handlers.insert(TAG_STRING_REF, Arc::clone(&index));
            handlers.insert(TAG_SHARED_REF, index);
            handlers.insert(TAG_SHAREABLE, Arc::new(ShareableTag));
            handlers.insert(TAG_RATIONAL, Arc::new(RationalTag::new()));
            handlers.insert(TAG_URI, Arc::new(UriTag::new()));
            handlers.insert(TAG_UUID, Arc::new(UuidTag::new()));
            debug!("seeded tag registry with {} built-in handlers", handlers.len());
        }
        registry
    }

    /// Inserts or replaces the handler for `tag`.
    pub fn register(&self, tag: u64, handler: impl TagHandler + 'static) {
        self.register_arc(tag, Arc::new(handler));
    }

    pub fn register_arc(&self, tag: u64, handler: Arc<dyn TagHandler>) {
        let replaced = self.handlers.write().insert(tag, handler).is_some();
        debug!("registered handler for tag {} (replaced: {})", tag, replaced);
    }

    /// Removes the handler for `tag`, returning it.
    pub fn unregister(&self, tag: u64) -> Option<Arc<dyn TagHandler>> {
        self.handlers.write().remove(&tag)
    }

    pub fn find(&self, tag: u64) -> Option<Arc<dyn TagHandler>> {
        self.handlers.read().get(&tag).cloned()
    }

    /// Wraps `value` in `tag` and validates it. Unregistered tags are kept
    /// as is.
    pub fn apply_tag(&self, value: Value, tag: u64) -> Result<Value, DecodeError> {
        match self.find(tag) {
            Some(handler) => {
                trace!("validating tag {}", tag);
                handler.validate(tag, value)
            }
            None => Ok(Value::tagged(tag, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    struct Even {
        filter: TypeFilter,
    }

    impl TagHandler for Even {
        fn filter(&self) -> &TypeFilter {
            &self.filter
        }

        fn validate(&self, tag: u64, payload: Value) -> Result<Value, DecodeError> {
            match payload.as_i64() {
                Ok(v) if v % 2 == 0 => Ok(Value::tagged(tag, payload)),
                _ => Err(DecodeError::invalid_tag(tag, "Not even")),
            }
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = TagRegistry::with_builtins();
        for tag in [0, 2, 3, 4, 5, 21, 22, 23, 25, 28, 29, 30, 32, 33, 34, 35, 36, 37, 264, 265] {
            assert!(registry.find(tag).is_some(), "tag {}", tag);
        }
        assert!(registry.find(1).is_none());
        assert!(registry.find(256).is_none());
    }

    #[test]
    fn test_apply_tag() {
        let registry = default_registry();
        let big = registry
            .apply_tag(Value::bytes(vec![1, 0, 0, 0, 0, 0, 0, 0, 0]), 2)
            .unwrap();
        assert_eq!(big, Value::from(BigInt::from(1) << 64usize));

        let unknown = registry.apply_tag(Value::from(1), 1000).unwrap();
        assert_eq!(unknown, Value::tagged(1000, 1));

        let err = Value::from_tag(37, Value::bytes(vec![0; 4])).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTag { tag: 37, .. }));
    }

    #[test]
    fn test_register_replaces() {
        let registry = TagRegistry::new();
        assert_eq!(registry.apply_tag(Value::from(3), 99).unwrap(), Value::tagged(99, 3));
        registry.register(
            99,
            Even {
                filter: TypeFilter::none().with_integers(),
            },
        );
        assert!(registry.apply_tag(Value::from(3), 99).is_err());
        assert!(registry.apply_tag(Value::from(4), 99).is_ok());
        assert!(registry.unregister(99).is_some());
        assert!(registry.apply_tag(Value::from(3), 99).is_ok());
    }
}
