//! Numeric tower shared by every number-like item kind.
//!
//! Seven representations implement [`Numeric`]: `i64`, [`BigInt`], `f32`,
//! `f64`, [`ExtendedDecimal`], [`ExtendedFloat`] and [`ExtendedRational`].
//! [`NumberRef`] borrows any one of them and provides comparison and
//! arithmetic across representations.

mod extended;
mod native;
mod parse;
mod rational;

pub use extended::{ExtendedDecimal, ExtendedFloat, ExtendedNumber};
pub use parse::parse_number_literal;
pub use rational::ExtendedRational;

pub(crate) use extended::Special;

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;

use crate::error::RangeError;
use crate::model::Value;

/// Sign of a number. NaN has no sign and reports [`Sign::Unordered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
    Unordered,
}

impl Sign {
    /// Returns -1, 0 or 1, and 2 for NaN.
    pub fn as_i32(self) -> i32 {
        match self {
            Sign::Negative => -1,
            Sign::Zero => 0,
            Sign::Positive => 1,
            Sign::Unordered => 2,
        }
    }

    pub(crate) fn of(negative: bool, zero: bool) -> Sign {
        if zero {
            Sign::Zero
        } else if negative {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }
}

/// Capabilities every numeric representation provides.
///
/// Conversions to integers truncate toward zero and fail with a
/// [`RangeError`] for NaN, infinities and values outside the target range.
pub trait Numeric {
    fn is_positive_infinity(&self) -> bool;

    fn is_negative_infinity(&self) -> bool;

    fn is_infinity(&self) -> bool {
        self.is_positive_infinity() || self.is_negative_infinity()
    }

    fn is_nan(&self) -> bool;

    fn is_finite(&self) -> bool {
        !self.is_infinity() && !self.is_nan()
    }

    fn is_zero(&self) -> bool;

    fn sign(&self) -> Sign;

    /// True for finite values without a fractional part.
    fn is_integral(&self) -> bool;

    /// Nearest `f64`, correctly rounded.
    fn as_f64(&self) -> f64;

    /// Nearest `f32`, correctly rounded.
    fn as_f32(&self) -> f32;

    /// Truncates toward zero.
    fn as_big_integer(&self) -> Result<BigInt, RangeError>;

    fn as_i64(&self) -> Result<i64, RangeError>;

    /// Truncates toward zero and checks the result against `min..=max`.
    fn as_i32(&self, min: i32, max: i32) -> Result<i32, RangeError> {
        let value = self.as_i64().map_err(|err| match err {
            RangeError::OutOfRange { .. } => RangeError::OutOfRange { target: "i32" },
            other => other,
        })?;
        i32::try_from(value)
            .ok()
            .filter(|v| (min..=max).contains(v))
            .ok_or(RangeError::OutOfRange { target: "i32" })
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal;

    fn as_extended_float(&self) -> ExtendedFloat;

    fn as_extended_rational(&self) -> ExtendedRational;

    fn negate(&self) -> Value;

    fn abs(&self) -> Value;

    /// True when the value is integral and fits `i32` exactly.
    fn can_fit_in_i32(&self) -> bool {
        self.is_integral() && self.as_i32(i32::MIN, i32::MAX).is_ok()
    }

    /// True when the value is integral and fits `i64` exactly.
    fn can_fit_in_i64(&self) -> bool {
        self.is_integral() && self.as_i64().is_ok()
    }

    /// True when converting to `f32` and back loses nothing. Non-finite
    /// values always fit.
    fn can_fit_in_f32(&self) -> bool;

    /// True when converting to `f64` and back loses nothing. Non-finite
    /// values always fit.
    fn can_fit_in_f64(&self) -> bool;

    fn can_truncated_int_fit_in_i32(&self) -> bool {
        self.as_i32(i32::MIN, i32::MAX).is_ok()
    }

    fn can_truncated_int_fit_in_i64(&self) -> bool {
        self.as_i64().is_ok()
    }
}

/// Borrowed view of any numeric item.
#[derive(Debug, Clone, Copy)]
pub enum NumberRef<'a> {
    Integer(i64),
    BigInt(&'a BigInt),
    Single(f32),
    Double(f64),
    Decimal(&'a ExtendedDecimal),
    Float(&'a ExtendedFloat),
    Rational(&'a ExtendedRational),
}

macro_rules! dispatch {
    ($self:expr, $method:ident) => {
        match $self {
            NumberRef::Integer(n) => Numeric::$method(n),
            NumberRef::BigInt(n) => Numeric::$method(*n),
            NumberRef::Single(n) => Numeric::$method(n),
            NumberRef::Double(n) => Numeric::$method(n),
            NumberRef::Decimal(n) => Numeric::$method(*n),
            NumberRef::Float(n) => Numeric::$method(*n),
            NumberRef::Rational(n) => Numeric::$method(*n),
        }
    };
}

impl Numeric for NumberRef<'_> {
    fn is_positive_infinity(&self) -> bool {
        dispatch!(self, is_positive_infinity)
    }

    fn is_negative_infinity(&self) -> bool {
        dispatch!(self, is_negative_infinity)
    }

    fn is_nan(&self) -> bool {
        dispatch!(self, is_nan)
    }

    fn is_zero(&self) -> bool {
        dispatch!(self, is_zero)
    }

    fn sign(&self) -> Sign {
        dispatch!(self, sign)
    }

    fn is_integral(&self) -> bool {
        dispatch!(self, is_integral)
    }

    fn as_f64(&self) -> f64 {
        dispatch!(self, as_f64)
    }

    fn as_f32(&self) -> f32 {
        dispatch!(self, as_f32)
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        dispatch!(self, as_big_integer)
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        dispatch!(self, as_i64)
    }

    fn as_extended_decimal(&self) -> ExtendedDecimal {
        dispatch!(self, as_extended_decimal)
    }

    fn as_extended_float(&self) -> ExtendedFloat {
        dispatch!(self, as_extended_float)
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        dispatch!(self, as_extended_rational)
    }

    fn negate(&self) -> Value {
        dispatch!(self, negate)
    }

    fn abs(&self) -> Value {
        dispatch!(self, abs)
    }

    fn can_fit_in_f32(&self) -> bool {
        dispatch!(self, can_fit_in_f32)
    }

    fn can_fit_in_f64(&self) -> bool {
        dispatch!(self, can_fit_in_f64)
    }
}

/// Order in which operands are promoted for comparison and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Promotion {
    Integer,
    Double,
    Float,
    Decimal,
    Rational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl NumberRef<'_> {
    fn promotion(&self) -> Promotion {
        match self {
            NumberRef::Integer(_) | NumberRef::BigInt(_) => Promotion::Integer,
            NumberRef::Single(_) | NumberRef::Double(_) => Promotion::Double,
            NumberRef::Float(_) => Promotion::Float,
            NumberRef::Decimal(_) => Promotion::Decimal,
            NumberRef::Rational(_) => Promotion::Rational,
        }
    }

    /// Estimated `log2` of the magnitude of a finite non-zero value, within 2.
    fn approx_log2(&self) -> Option<f64> {
        if !self.is_finite() || self.is_zero() {
            return None;
        }
        match self {
            NumberRef::Integer(v) => Some((v.unsigned_abs() as f64).log2()),
            NumberRef::BigInt(v) => Some(v.bits() as f64 - 0.5),
            NumberRef::Single(v) => Some(f64::from(*v).abs().log2()),
            NumberRef::Double(v) => Some((*v).abs().log2()),
            NumberRef::Decimal(v) => v.approx_log2(),
            NumberRef::Float(v) => v.approx_log2(),
            NumberRef::Rational(v) => v.approx_log2(),
        }
    }

    /// Total order by mathematical value. NaN sorts after every other number
    /// and equals NaN.
    pub fn compare(&self, other: &NumberRef<'_>) -> Ordering {
        match (self.is_nan(), other.is_nan()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        match (self, other) {
            (NumberRef::Integer(a), NumberRef::Integer(b)) => return a.cmp(b),
            (NumberRef::BigInt(a), NumberRef::BigInt(b)) => return a.cmp(b),
            (NumberRef::Integer(a), NumberRef::BigInt(b)) => return BigInt::from(*a).cmp(*b),
            (NumberRef::BigInt(a), NumberRef::Integer(b)) => return (*a).cmp(&BigInt::from(*b)),
            (NumberRef::Double(a), NumberRef::Double(b)) => {
                return a.partial_cmp(b).unwrap_or(Ordering::Equal);
            }
            (NumberRef::Single(a), NumberRef::Single(b)) => {
                return a.partial_cmp(b).unwrap_or(Ordering::Equal);
            }
            (NumberRef::Single(a), NumberRef::Double(b)) => {
                return f64::from(*a).partial_cmp(b).unwrap_or(Ordering::Equal);
            }
            (NumberRef::Double(a), NumberRef::Single(b)) => {
                return a.partial_cmp(&f64::from(*b)).unwrap_or(Ordering::Equal);
            }
            (NumberRef::Decimal(a), NumberRef::Decimal(b)) => return a.compare(b),
            (NumberRef::Float(a), NumberRef::Float(b)) => return a.compare(b),
            (NumberRef::Rational(a), NumberRef::Rational(b)) => return a.compare(b),
            _ => {}
        }

        let (sa, sb) = (self.sign().as_i32(), other.sign().as_i32());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }

        let magnitude = match (self.is_infinity(), other.is_infinity()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare_finite_magnitude(other),
        };
        if sa < 0 {
            magnitude.reverse()
        } else {
            magnitude
        }
    }

    /// Compares magnitudes of two finite non-zero values of the same sign.
    fn compare_finite_magnitude(&self, other: &NumberRef<'_>) -> Ordering {
        if let (Some(a), Some(b)) = (self.approx_log2(), other.approx_log2()) {
            if a - b > 4.0 {
                return Ordering::Greater;
            }
            if b - a > 4.0 {
                return Ordering::Less;
            }
        }
        let ordering = match self.promotion().max(other.promotion()) {
            Promotion::Rational => self
                .as_extended_rational()
                .compare(&other.as_extended_rational()),
            Promotion::Decimal => self
                .as_extended_decimal()
                .compare(&other.as_extended_decimal()),
            _ => self.as_extended_float().compare(&other.as_extended_float()),
        };
        // Both operands share a sign here; compare() re-applies it.
        if self.sign() == Sign::Negative {
            ordering.reverse()
        } else {
            ordering
        }
    }

    pub fn add(&self, other: &NumberRef<'_>) -> Result<Value, RangeError> {
        self.apply(other, Op::Add)
    }

    pub fn subtract(&self, other: &NumberRef<'_>) -> Result<Value, RangeError> {
        self.apply(other, Op::Subtract)
    }

    pub fn multiply(&self, other: &NumberRef<'_>) -> Result<Value, RangeError> {
        self.apply(other, Op::Multiply)
    }

    /// Exact quotient. Integers that do not divide evenly yield a rational.
    pub fn divide(&self, other: &NumberRef<'_>) -> Result<Value, RangeError> {
        self.apply(other, Op::Divide)
    }

    /// Remainder of truncated division; takes the sign of the dividend.
    pub fn remainder(&self, other: &NumberRef<'_>) -> Result<Value, RangeError> {
        self.apply(other, Op::Remainder)
    }

    fn apply(&self, other: &NumberRef<'_>, op: Op) -> Result<Value, RangeError> {
        let mut level = self.promotion().max(other.promotion());
        if level > Promotion::Double && (!self.is_finite() || !other.is_finite()) {
            level = Promotion::Double;
        }
        match level {
            Promotion::Integer => integer_op(self.as_big_integer()?, other.as_big_integer()?, op),
            Promotion::Double => Ok(Value::Double(double_op(self.as_f64(), other.as_f64(), op))),
            Promotion::Float => {
                let (a, b) = (self.as_extended_float(), other.as_extended_float());
                match op {
                    Op::Add => Ok(Value::from(a.add(&b)?)),
                    Op::Subtract => Ok(Value::from(a.add(&b.negated())?)),
                    Op::Multiply => Ok(Value::from(a.multiply(&b))),
                    Op::Divide | Op::Remainder => {
                        let exact = rational_op(&a.to_rational(), &b.to_rational(), op)?;
                        Ok(match exact.to_exact_float() {
                            Some(float) => Value::from(float),
                            None => Value::from(exact),
                        })
                    }
                }
            }
            Promotion::Decimal => {
                let (a, b) = (self.as_extended_decimal(), other.as_extended_decimal());
                match op {
                    Op::Add => Ok(Value::from(a.add(&b)?)),
                    Op::Subtract => Ok(Value::from(a.add(&b.negated())?)),
                    Op::Multiply => Ok(Value::from(a.multiply(&b))),
                    Op::Divide | Op::Remainder => {
                        let exact = rational_op(&a.to_rational(), &b.to_rational(), op)?;
                        Ok(match exact.to_exact_decimal() {
                            Some(decimal) => Value::from(decimal),
                            None => Value::from(exact),
                        })
                    }
                }
            }
            Promotion::Rational => {
                let (a, b) = (self.as_extended_rational(), other.as_extended_rational());
                Ok(Value::from(rational_op(&a, &b, op)?))
            }
        }
    }
}

fn integer_op(a: BigInt, b: BigInt, op: Op) -> Result<Value, RangeError> {
    let result = match op {
        Op::Add => a + b,
        Op::Subtract => a - b,
        Op::Multiply => a * b,
        Op::Divide => {
            if Zero::is_zero(&b) {
                return Err(RangeError::DivisionByZero);
            }
            let (quotient, remainder) = a.div_rem(&b);
            if !Zero::is_zero(&remainder) {
                return Ok(Value::from(ExtendedRational::from_signed(a, b).reduced()));
            }
            quotient
        }
        Op::Remainder => {
            if Zero::is_zero(&b) {
                return Err(RangeError::DivisionByZero);
            }
            a % b
        }
    };
    Ok(Value::from(result))
}

fn double_op(a: f64, b: f64, op: Op) -> f64 {
    match op {
        Op::Add => a + b,
        Op::Subtract => a - b,
        Op::Multiply => a * b,
        Op::Divide => a / b,
        Op::Remainder => a % b,
    }
}

fn rational_op(
    a: &ExtendedRational,
    b: &ExtendedRational,
    op: Op,
) -> Result<ExtendedRational, RangeError> {
    match op {
        Op::Add => Ok(a.add(b)),
        Op::Subtract => Ok(a.add(&b.negated())),
        Op::Multiply => Ok(a.multiply(b)),
        Op::Divide => a.divide(b),
        Op::Remainder => a.remainder(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(mantissa: i64, exponent: i64) -> ExtendedDecimal {
        ExtendedDecimal::new(BigInt::from(mantissa), BigInt::from(exponent))
    }

    #[test]
    fn test_sign_sentinel() {
        assert_eq!(NumberRef::Double(f64::NAN).sign(), Sign::Unordered);
        assert_eq!(Sign::Unordered.as_i32(), 2);
        assert_eq!(NumberRef::Integer(-4).sign().as_i32(), -1);
        assert_eq!(NumberRef::Double(-0.0).sign(), Sign::Zero);
    }

    #[test]
    fn test_big_int_zero_and_sign() {
        let zero = BigInt::from(0);
        let negative = -(BigInt::from(1) << 70usize);
        assert!(NumberRef::BigInt(&zero).is_zero());
        assert_eq!(NumberRef::BigInt(&zero).sign(), Sign::Zero);
        assert!(!NumberRef::BigInt(&negative).is_zero());
        assert_eq!(NumberRef::BigInt(&negative).sign().as_i32(), -1);
        assert!(NumberRef::Integer(0).is_zero());
    }

    #[test]
    fn test_cross_kind_compare() {
        let one_and_half = decimal(15, -1);
        let big = BigInt::from(10).pow(30);
        let cases = [
            (NumberRef::Integer(1), NumberRef::Double(1.5), Ordering::Less),
            (NumberRef::Decimal(&one_and_half), NumberRef::Double(1.5), Ordering::Equal),
            (NumberRef::Integer(2), NumberRef::Decimal(&one_and_half), Ordering::Greater),
            (NumberRef::BigInt(&big), NumberRef::Double(1e30), Ordering::Less),
            (NumberRef::Double(-1.0), NumberRef::Integer(0), Ordering::Less),
            (NumberRef::Double(f64::NAN), NumberRef::Integer(i64::MAX), Ordering::Greater),
            (NumberRef::Double(f64::NAN), NumberRef::Single(f32::NAN), Ordering::Equal),
            (NumberRef::Double(f64::NEG_INFINITY), NumberRef::BigInt(&big), Ordering::Less),
        ];
        for (a, b, expected) in cases {
            assert_eq!(a.compare(&b), expected, "{:?} vs {:?}", a, b);
            assert_eq!(b.compare(&a), expected.reverse(), "{:?} vs {:?}", b, a);
        }
    }

    #[test]
    fn test_compare_negative_close_values() {
        let a = decimal(-15, -1);
        let b = ExtendedRational::new(BigInt::from(-3), BigInt::from(2)).unwrap();
        let c = ExtendedRational::new(BigInt::from(-4), BigInt::from(3)).unwrap();
        assert_eq!(NumberRef::Decimal(&a).compare(&NumberRef::Rational(&b)), Ordering::Equal);
        assert_eq!(NumberRef::Decimal(&a).compare(&NumberRef::Rational(&c)), Ordering::Less);
    }

    #[test]
    fn test_integer_arithmetic_promotes() {
        let sum = NumberRef::Integer(i64::MAX).add(&NumberRef::Integer(1)).unwrap();
        assert_eq!(sum, Value::from(BigInt::from(i64::MAX) + 1));

        let quotient = NumberRef::Integer(6).divide(&NumberRef::Integer(3)).unwrap();
        assert_eq!(quotient, Value::Integer(2));

        let third = NumberRef::Integer(1).divide(&NumberRef::Integer(3)).unwrap();
        assert!(matches!(third, Value::Rational(_)));

        let err = NumberRef::Integer(1).divide(&NumberRef::Integer(0)).unwrap_err();
        assert_eq!(err, RangeError::DivisionByZero);

        let rem = NumberRef::Integer(-7).remainder(&NumberRef::Integer(2)).unwrap();
        assert_eq!(rem, Value::Integer(-1));
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = decimal(15, -1);
        let b = decimal(25, -2);
        let sum = NumberRef::Decimal(&a).add(&NumberRef::Decimal(&b)).unwrap();
        assert_eq!(sum, Value::Decimal(decimal(175, -2)));

        let quotient = NumberRef::Decimal(&a).divide(&NumberRef::Integer(4)).unwrap();
        assert_eq!(
            NumberRef::Double(0.375).compare(&quotient.as_number().unwrap()),
            Ordering::Equal
        );
    }

    #[test]
    fn test_double_arithmetic() {
        let product = NumberRef::Double(1.5).multiply(&NumberRef::Integer(2)).unwrap();
        assert_eq!(product, Value::Double(3.0));
        let inf = NumberRef::Double(1.0).divide(&NumberRef::Double(0.0)).unwrap();
        assert_eq!(inf, Value::Double(f64::INFINITY));
    }
}
