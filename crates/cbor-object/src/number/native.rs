//! [`Numeric`] for the machine and big-integer representations.

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use super::extended::binary_to_native;
use super::{ExtendedDecimal, ExtendedFloat, ExtendedRational, Numeric, Sign};
use crate::error::RangeError;
use crate::model::Value;

// 2^63 as a double; the first value past the positive `i64` range.
const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

impl Numeric for i64 {
    fn is_positive_infinity(&self) -> bool {
        false
    }

    fn is_negative_infinity(&self) -> bool {
        false
    }

    fn is_nan(&self) -> bool {
        false
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn sign(&self) -> Sign {
        Sign::of(*self < 0, *self == 0)
    }

    fn is_integral(&self) -> bool {
        true
    }

    fn as_f64(&self) -> f64 {
        *self as f64
    }

    fn as_f32(&self) -> f32 {
        *self as f32
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        Ok(BigInt::from(*self))
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        Ok(*self)
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal {
        ExtendedDecimal::from_i64(*self)
    }

    fn as_extended_float(&self) -> ExtendedFloat {
        ExtendedFloat::from_i64(*self)
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        ExtendedRational::from_i64(*self)
    }

    fn negate(&self) -> Value {
        match self.checked_neg() {
            Some(v) => Value::Integer(v),
            None => Value::from(-BigInt::from(*self)),
        }
    }

    fn abs(&self) -> Value {
        match self.checked_abs() {
            Some(v) => Value::Integer(v),
            None => Value::from(Signed::abs(&BigInt::from(*self))),
        }
    }

    fn can_fit_in_f32(&self) -> bool {
        let native = *self as f32;
        f64::from(native) != TWO_POW_63 && native as i64 == *self
    }

    fn can_fit_in_f64(&self) -> bool {
        let native = *self as f64;
        native != TWO_POW_63 && native as i64 == *self
    }
}

impl Numeric for BigInt {
    fn is_positive_infinity(&self) -> bool {
        false
    }

    fn is_negative_infinity(&self) -> bool {
        false
    }

    fn is_nan(&self) -> bool {
        false
    }

    fn is_zero(&self) -> bool {
        Zero::is_zero(self)
    }

    fn sign(&self) -> Sign {
        Sign::of(self.is_negative(), Zero::is_zero(self))
    }

    fn is_integral(&self) -> bool {
        true
    }

    fn as_f64(&self) -> f64 {
        binary_to_native::<f64>(self.is_negative(), self.magnitude(), 0)
    }

    fn as_f32(&self) -> f32 {
        binary_to_native::<f32>(self.is_negative(), self.magnitude(), 0)
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        Ok(self.clone())
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        self.to_i64().ok_or(RangeError::OutOfRange { target: "i64" })
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal {
        ExtendedDecimal::from_big_int(self)
    }

    fn as_extended_float(&self) -> ExtendedFloat {
        ExtendedFloat::from_big_int(self)
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        ExtendedRational::from_big_int(self)
    }

    fn negate(&self) -> Value {
        Value::from(-self)
    }

    fn abs(&self) -> Value {
        Value::from(Signed::abs(self))
    }

    fn can_fit_in_f32(&self) -> bool {
        let native = self.as_f32();
        native.is_finite() && BigInt::from_f32(native).as_ref() == Some(self)
    }

    fn can_fit_in_f64(&self) -> bool {
        let native = self.as_f64();
        native.is_finite() && BigInt::from_f64(native).as_ref() == Some(self)
    }
}

impl Numeric for f64 {
    fn is_positive_infinity(&self) -> bool {
        *self == f64::INFINITY
    }

    fn is_negative_infinity(&self) -> bool {
        *self == f64::NEG_INFINITY
    }

    fn is_nan(&self) -> bool {
        f64::is_nan(*self)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn sign(&self) -> Sign {
        if f64::is_nan(*self) {
            Sign::Unordered
        } else {
            Sign::of(*self < 0.0, *self == 0.0)
        }
    }

    fn is_integral(&self) -> bool {
        self.is_finite() && self.trunc() == *self
    }

    fn as_f64(&self) -> f64 {
        *self
    }

    fn as_f32(&self) -> f32 {
        *self as f32
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        if !self.is_finite() {
            return Err(RangeError::NotFinite);
        }
        BigInt::from_f64(self.trunc()).ok_or(RangeError::NotFinite)
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        if !self.is_finite() {
            return Err(RangeError::NotFinite);
        }
        let truncated = self.trunc();
        if (-TWO_POW_63..TWO_POW_63).contains(&truncated) {
            Ok(truncated as i64)
        } else {
            Err(RangeError::OutOfRange { target: "i64" })
        }
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal {
        ExtendedDecimal::from_f64(*self)
    }

    fn as_extended_float(&self) -> ExtendedFloat {
        ExtendedFloat::from_f64(*self)
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        ExtendedRational::from_f64(*self)
    }

    fn negate(&self) -> Value {
        Value::Double(-*self)
    }

    fn abs(&self) -> Value {
        Value::Double(f64::abs(*self))
    }

    fn can_fit_in_f32(&self) -> bool {
        !self.is_finite() || f64::from(*self as f32) == *self
    }

    fn can_fit_in_f64(&self) -> bool {
        true
    }
}

impl Numeric for f32 {
    fn is_positive_infinity(&self) -> bool {
        *self == f32::INFINITY
    }

    fn is_negative_infinity(&self) -> bool {
        *self == f32::NEG_INFINITY
    }

    fn is_nan(&self) -> bool {
        f32::is_nan(*self)
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    fn sign(&self) -> Sign {
        f64::from(*self).sign()
    }

    fn is_integral(&self) -> bool {
        f64::from(*self).is_integral()
    }

    fn as_f64(&self) -> f64 {
        f64::from(*self)
    }

    fn as_f32(&self) -> f32 {
        *self
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        f64::from(*self).as_big_integer()
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        f64::from(*self).as_i64()
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal {
        ExtendedDecimal::from_f32(*self)
    }

    fn as_extended_float(&self) -> ExtendedFloat {
        ExtendedFloat::from_f32(*self)
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        ExtendedRational::from_f64(f64::from(*self))
    }

    fn negate(&self) -> Value {
        Value::Single(-*self)
    }

    fn abs(&self) -> Value {
        Value::Single(f32::abs(*self))
    }

    fn can_fit_in_f32(&self) -> bool {
        true
    }

    fn can_fit_in_f64(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_truncation() {
        assert_eq!(2.7f64.as_i64(), Ok(2));
        assert_eq!((-2.7f64).as_i64(), Ok(-2));
        assert_eq!(f64::NAN.as_i64(), Err(RangeError::NotFinite));
        assert_eq!(1e19f64.as_i64(), Err(RangeError::OutOfRange { target: "i64" }));
        assert_eq!((-TWO_POW_63).as_i64(), Ok(i64::MIN));
        assert_eq!(3.9f64.as_i32(0, 3), Ok(3));
        assert!(3.9f64.as_i32(0, 2).is_err());
    }

    #[test]
    fn test_fit_queries() {
        assert!(f64::NAN.can_fit_in_f32());
        assert!(f64::INFINITY.can_fit_in_f32());
        assert!(1.5f64.can_fit_in_f32());
        assert!(!0.1f64.can_fit_in_f32());
        assert!(!i64::MAX.can_fit_in_f64());
        assert!((1i64 << 53).can_fit_in_f64());
        assert!(!((1i64 << 53) + 1).can_fit_in_f64());
        assert!(!2.5f64.can_fit_in_i64());
        assert!(2.5f64.can_truncated_int_fit_in_i64());
        assert!(!1e10f64.can_fit_in_i32());
    }

    #[test]
    fn test_negate_overflow_promotes() {
        assert_eq!(i64::MIN.negate(), Value::from(-BigInt::from(i64::MIN)));
        assert_eq!(5i64.negate(), Value::Integer(-5));
        assert_eq!(Numeric::abs(&-2.5f64), Value::Double(2.5));
    }

    #[test]
    fn test_big_integer_to_double_rounds() {
        let big: BigInt = (BigInt::from(1) << 80usize) + 1;
        assert_eq!(big.as_f64(), 2f64.powi(80));
        assert!(!big.can_fit_in_f64());
        assert!((BigInt::from(1) << 80usize).can_fit_in_f64());
    }
}
