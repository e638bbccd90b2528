//! Conversions from Rust values into [`Value`].
//!
//! Statically typed conversions are `From` impls. Dynamically typed objects
//! go through a [`ConverterRegistry`], which maps a concrete type to a
//! function producing a `Value`.

use std::any::{Any, TypeId};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::debug;
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::model::{Array, Map, SimpleValue, Value};
use crate::number::{ExtendedDecimal, ExtendedFloat, ExtendedRational, Special};

// =============================================================================
// FROM IMPLS
// =============================================================================

macro_rules! from_small_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Integer(i64::from(value))
            }
        })*
    };
}

from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Value::Integer(v),
            Err(_) => Value::BigInt(BigInt::from(value)),
        }
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::from(BigInt::from(value))
    }
}

/// Normalizes to `Integer` when the value fits `i64`.
impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        match value.to_i64() {
            Some(v) => Value::Integer(v),
            None => Value::BigInt(value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Single(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::TextString(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::TextString(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::ByteString(value.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::ByteString(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from_vec(items))
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<SimpleValue> for Value {
    fn from(value: SimpleValue) -> Self {
        Value::Simple(value)
    }
}

impl From<Uuid> for Value {
    fn from(uuid: Uuid) -> Self {
        Value::from_uuid(uuid)
    }
}

/// `None` becomes null.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::NULL, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(iter.into_iter().collect())
    }
}

impl FromIterator<(Value, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().collect())
    }
}

macro_rules! from_extended {
    ($ty:ty, $variant:ident) => {
        /// Non-finite values and negative zero become `Double`; a zero
        /// exponent yields the plain integer mantissa.
        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                match value.special() {
                    Special::NaN => return Value::Double(f64::NAN),
                    Special::Infinity => {
                        return Value::Double(if value.is_negative() {
                            f64::NEG_INFINITY
                        } else {
                            f64::INFINITY
                        });
                    }
                    Special::Finite => {}
                }
                if value.is_negative_zero() {
                    return Value::Double(-0.0);
                }
                if num_traits::Zero::is_zero(value.exponent()) {
                    return Value::from(value.mantissa());
                }
                Value::$variant(value)
            }
        }
    };
}

from_extended!(ExtendedDecimal, Decimal);
from_extended!(ExtendedFloat, Float);

/// Specials and negative zero become `Double`; a denominator of one yields
/// the numerator.
impl From<ExtendedRational> for Value {
    fn from(value: ExtendedRational) -> Self {
        match value.special() {
            Special::NaN => return Value::Double(f64::NAN),
            Special::Infinity => {
                return Value::Double(if value.is_negative() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                });
            }
            Special::Finite => {}
        }
        if value.is_negative_zero() {
            return Value::Double(-0.0);
        }
        if value.unsigned_denominator().is_one() {
            return Value::from(value.numerator());
        }
        Value::Rational(value)
    }
}

// =============================================================================
// CONVERTER REGISTRY
// =============================================================================

/// Function turning a type-erased object into a value.
pub type Converter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// Table of converters keyed by the concrete type of the object.
///
/// Primitive types (integers, floats, `bool`, strings, byte vectors, `Uuid`
/// and `Value` itself) are converted without registration.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: RwLock<FxHashMap<TypeId, Converter>>,
}

impl std::fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("registered", &self.converters.read().len())
            .finish()
    }
}

lazy_static! {
    static ref DEFAULT_CONVERTERS: ConverterRegistry = ConverterRegistry::new();
}

/// Process-wide converter registry.
pub fn default_converters() -> &'static ConverterRegistry {
    &DEFAULT_CONVERTERS
}

macro_rules! try_primitive {
    ($object:expr, $($ty:ty),*) => {
        $(if let Some(v) = $object.downcast_ref::<$ty>() {
            return Some(Value::from(v.clone()));
        })*
    };
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the converter for `T`.
    pub fn register<T, F>(&self, convert: F)
    where
        T: Any,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let converter: Converter =
            Arc::new(move |object: &dyn Any| object.downcast_ref::<T>().map(|t| convert(t)));
        debug!("registering converter for {}", std::any::type_name::<T>());
        self.converters.write().insert(TypeId::of::<T>(), converter);
    }

    pub fn is_registered<T: Any>(&self) -> bool {
        self.converters.read().contains_key(&TypeId::of::<T>())
    }

    /// Converts `object`, or returns `None` when its type is unknown.
    pub fn to_value(&self, object: &dyn Any) -> Option<Value> {
        try_primitive!(
            object, Value, i8, i16, i32, i64, u8, u16, u32, u64, i128, BigInt, bool, f32, f64,
            String, Vec<u8>, Uuid, ExtendedDecimal, ExtendedFloat, ExtendedRational
        );
        if let Some(text) = object.downcast_ref::<&'static str>() {
            return Some(Value::from(*text));
        }
        let converter = self.converters.read().get(&object.type_id()).cloned()?;
        converter(object)
    }
}
