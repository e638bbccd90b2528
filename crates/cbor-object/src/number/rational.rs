//! Arbitrary-precision rational numbers (tag 30).

use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, BigUint, Sign as BigSign};
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};

use super::extended::{binary_to_native, round_half_even, Special};
use super::{ExtendedDecimal, ExtendedFloat, Numeric, Sign};
use crate::error::{ArgumentError, RangeError};
use crate::model::Value;

/// A fraction `numerator / denominator` with a positive denominator.
///
/// Fractions are kept as given; [`ExtendedRational::reduced`] divides out
/// common factors. Equality is structural, ordering is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedRational {
    negative: bool,
    numerator: BigUint,
    denominator: BigUint,
    special: Special,
}

impl ExtendedRational {
    /// Creates a fraction. A negative denominator moves its sign to the
    /// numerator.
    pub fn new(numerator: BigInt, denominator: BigInt) -> Result<Self, ArgumentError> {
        if Zero::is_zero(&denominator) {
            return Err(ArgumentError::ZeroDenominator);
        }
        Ok(Self::from_signed(numerator, denominator))
    }

    /// `denominator` must be non-zero.
    pub(crate) fn from_signed(numerator: BigInt, denominator: BigInt) -> Self {
        let negative = !Zero::is_zero(&numerator)
            && ((numerator.sign() == BigSign::Minus) != (denominator.sign() == BigSign::Minus));
        Self::from_parts(
            negative,
            numerator.magnitude().clone(),
            denominator.magnitude().clone(),
        )
    }

    pub(crate) fn from_parts(negative: bool, numerator: BigUint, denominator: BigUint) -> Self {
        Self {
            negative,
            numerator,
            denominator,
            special: Special::Finite,
        }
    }

    pub fn from_big_int(value: &BigInt) -> Self {
        Self::from_signed(value.clone(), BigInt::one())
    }

    pub fn from_i64(value: i64) -> Self {
        Self::from_big_int(&BigInt::from(value))
    }

    pub fn from_f64(value: f64) -> Self {
        ExtendedFloat::from_f64(value).to_rational()
    }

    pub fn infinity(negative: bool) -> Self {
        Self {
            negative,
            numerator: BigUint::zero(),
            denominator: BigUint::one(),
            special: Special::Infinity,
        }
    }

    pub fn nan() -> Self {
        Self {
            negative: false,
            numerator: BigUint::zero(),
            denominator: BigUint::one(),
            special: Special::NaN,
        }
    }

    /// Signed numerator.
    pub fn numerator(&self) -> BigInt {
        let sign = if self.negative { BigSign::Minus } else { BigSign::Plus };
        BigInt::from_biguint(sign, self.numerator.clone())
    }

    /// Always positive.
    pub fn denominator(&self) -> BigInt {
        BigInt::from(self.denominator.clone())
    }

    pub fn unsigned_numerator(&self) -> &BigUint {
        &self.numerator
    }

    pub fn unsigned_denominator(&self) -> &BigUint {
        &self.denominator
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_negative_zero(&self) -> bool {
        self.special == Special::Finite && self.negative && self.numerator.is_zero()
    }

    pub(crate) fn special(&self) -> Special {
        self.special
    }

    /// The same value in lowest terms.
    pub fn reduced(&self) -> Self {
        if self.special != Special::Finite {
            return self.clone();
        }
        let gcd = self.numerator.gcd(&self.denominator);
        if gcd.is_one() || gcd.is_zero() {
            return self.clone();
        }
        Self::from_parts(self.negative, &self.numerator / &gcd, &self.denominator / &gcd)
    }

    pub fn negated(&self) -> Self {
        let mut out = self.clone();
        if out.special != Special::NaN {
            out.negative = !out.negative;
        }
        out
    }

    pub fn abs_value(&self) -> Self {
        let mut out = self.clone();
        out.negative = false;
        out
    }

    pub(crate) fn approx_log2(&self) -> Option<f64> {
        if self.special != Special::Finite || self.numerator.is_zero() {
            return None;
        }
        Some(self.numerator.bits() as f64 - self.denominator.bits() as f64)
    }

    /// Total order by value. NaN sorts last and equals NaN.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.special == Special::NaN, other.special == Special::NaN) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let (sa, sb) = (self.sign().as_i32(), other.sign().as_i32());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if sa == 0 {
            return Ordering::Equal;
        }
        let magnitude = match (self.special, other.special) {
            (Special::Infinity, Special::Infinity) => Ordering::Equal,
            (Special::Infinity, _) => Ordering::Greater,
            (_, Special::Infinity) => Ordering::Less,
            _ => (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator)),
        };
        if sa < 0 { magnitude.reverse() } else { magnitude }
    }

    fn signed_numerator(&self) -> BigInt {
        self.numerator()
    }

    pub(crate) fn add(&self, other: &Self) -> Self {
        let numerator = self.signed_numerator() * BigInt::from(other.denominator.clone())
            + other.signed_numerator() * BigInt::from(self.denominator.clone());
        let denominator = &self.denominator * &other.denominator;
        Self::from_signed(numerator, BigInt::from(denominator)).reduced()
    }

    pub(crate) fn multiply(&self, other: &Self) -> Self {
        Self::from_parts(
            self.negative != other.negative,
            &self.numerator * &other.numerator,
            &self.denominator * &other.denominator,
        )
        .reduced()
    }

    pub(crate) fn divide(&self, other: &Self) -> Result<Self, RangeError> {
        if other.numerator.is_zero() {
            return Err(RangeError::DivisionByZero);
        }
        Ok(Self::from_parts(
            self.negative != other.negative,
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        )
        .reduced())
    }

    /// `self - other * trunc(self / other)`.
    pub(crate) fn remainder(&self, other: &Self) -> Result<Self, RangeError> {
        let quotient = self.divide(other)?;
        let truncated = Self::from_big_int(&quotient.truncate());
        Ok(self.add(&other.multiply(&truncated).negated()))
    }

    fn truncate(&self) -> BigInt {
        let sign = if self.negative { BigSign::Minus } else { BigSign::Plus };
        BigInt::from_biguint(sign, &self.numerator / &self.denominator)
    }

    /// Exact binary value when the reduced denominator is a power of two.
    pub(crate) fn to_exact_float(&self) -> Option<ExtendedFloat> {
        if self.special != Special::Finite {
            return None;
        }
        let reduced = self.reduced();
        let den = &reduced.denominator;
        let shift = den.bits() - 1;
        if *den != BigUint::one() << shift as usize {
            return None;
        }
        Some(ExtendedFloat::from_parts(
            reduced.negative,
            reduced.numerator,
            -BigInt::from(shift),
        ))
    }

    /// Exact decimal value when the reduced denominator has no prime
    /// factors other than 2 and 5.
    pub(crate) fn to_exact_decimal(&self) -> Option<ExtendedDecimal> {
        if self.special != Special::Finite {
            return None;
        }
        let reduced = self.reduced();
        let mut den = reduced.denominator.clone();
        let twos = den.trailing_zeros().unwrap_or(0);
        den >>= twos as usize;
        let five = BigUint::from(5u32);
        let mut fives = 0u64;
        loop {
            let (quotient, remainder) = den.div_rem(&five);
            if !remainder.is_zero() {
                break;
            }
            den = quotient;
            fives += 1;
        }
        if !den.is_one() {
            return None;
        }
        let scale = twos.max(fives);
        let mantissa = reduced.numerator
            * BigUint::from(2u32).pow((scale - twos) as u32)
            * five.pow((scale - fives) as u32);
        Some(ExtendedDecimal::from_parts(reduced.negative, mantissa, -BigInt::from(scale)))
    }

    /// Rounds half-even to `precision` significant bits.
    pub(crate) fn to_binary_rounded(&self, precision: u64) -> ExtendedFloat {
        match self.special {
            Special::NaN => return ExtendedFloat::nan(),
            Special::Infinity => return ExtendedFloat::infinity(self.negative),
            Special::Finite => {}
        }
        if self.numerator.is_zero() {
            return ExtendedFloat::from_parts(self.negative, BigUint::zero(), BigInt::zero());
        }
        let shift = (precision + 2) as i64 + self.denominator.bits() as i64 - self.numerator.bits() as i64;
        let (num, den) = scale_by_shift(&self.numerator, &self.denominator, shift);
        let (quotient, remainder) = num.div_rem(&den);
        let extra = quotient.bits().saturating_sub(precision);
        let divisor = BigUint::one() << extra as usize;
        let mut mantissa = round_half_even(&quotient, &divisor, !remainder.is_zero());
        let mut exponent = extra as i64 - shift;
        if mantissa.bits() > precision {
            mantissa >>= 1usize;
            exponent += 1;
        }
        ExtendedFloat::from_parts(self.negative, mantissa, BigInt::from(exponent))
    }

    /// Rounds half-even to `precision` significant decimal digits.
    pub(crate) fn to_decimal_rounded(&self, precision: u64) -> ExtendedDecimal {
        match self.special {
            Special::NaN => return ExtendedDecimal::nan(),
            Special::Infinity => return ExtendedDecimal::infinity(self.negative),
            Special::Finite => {}
        }
        if self.numerator.is_zero() {
            return ExtendedDecimal::from_parts(self.negative, BigUint::zero(), BigInt::zero());
        }
        const LOG10_2: f64 = std::f64::consts::LOG10_2;
        let num_digits = ((self.numerator.bits() - 1) as f64 * LOG10_2) as i64;
        let den_digits = (self.denominator.bits() as f64 * LOG10_2) as i64 + 1;
        let scale = precision as i64 + 2 + den_digits - num_digits;
        let ten = BigUint::from(10u32);
        let (num, den) = if scale >= 0 {
            (&self.numerator * ten.pow(scale as u32), self.denominator.clone())
        } else {
            (self.numerator.clone(), &self.denominator * ten.pow((-scale) as u32))
        };
        let (quotient, remainder) = num.div_rem(&den);
        let digits = quotient.to_string().len() as u64;
        let extra = digits.saturating_sub(precision);
        let mut mantissa = round_half_even(&quotient, &ten.pow(extra as u32), !remainder.is_zero());
        let mut exponent = extra as i64 - scale;
        if mantissa.to_string().len() as u64 > precision {
            mantissa /= &ten;
            exponent += 1;
        }
        ExtendedDecimal::from_parts(self.negative, mantissa, BigInt::from(exponent))
    }
}

fn scale_by_shift(num: &BigUint, den: &BigUint, shift: i64) -> (BigUint, BigUint) {
    if shift >= 0 {
        (num << shift as usize, den.clone())
    } else {
        (num.clone(), den << (-shift) as usize)
    }
}

impl fmt::Display for ExtendedRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.special {
            Special::NaN => f.write_str("NaN"),
            Special::Infinity if self.negative => f.write_str("-Infinity"),
            Special::Infinity => f.write_str("Infinity"),
            Special::Finite => {
                if self.negative {
                    f.write_str("-")?;
                }
                write!(f, "{}/{}", self.numerator, self.denominator)
            }
        }
    }
}

impl Numeric for ExtendedRational {
    fn is_positive_infinity(&self) -> bool {
        self.special == Special::Infinity && !self.negative
    }

    fn is_negative_infinity(&self) -> bool {
        self.special == Special::Infinity && self.negative
    }

    fn is_nan(&self) -> bool {
        self.special == Special::NaN
    }

    fn is_zero(&self) -> bool {
        self.special == Special::Finite && self.numerator.is_zero()
    }

    fn sign(&self) -> Sign {
        match self.special {
            Special::NaN => Sign::Unordered,
            Special::Infinity => Sign::of(self.negative, false),
            Special::Finite => Sign::of(self.negative, self.numerator.is_zero()),
        }
    }

    fn is_integral(&self) -> bool {
        self.special == Special::Finite && (&self.numerator % &self.denominator).is_zero()
    }

    fn as_f64(&self) -> f64 {
        self.to_native(f64::NAN, f64::INFINITY, |n, m, e| binary_to_native::<f64>(n, m, e))
    }

    fn as_f32(&self) -> f32 {
        self.to_native(f32::NAN, f32::INFINITY, |n, m, e| binary_to_native::<f32>(n, m, e))
    }

    fn as_big_integer(&self) -> Result<BigInt, RangeError> {
        if self.special != Special::Finite {
            return Err(RangeError::NotFinite);
        }
        Ok(self.truncate())
    }

    fn as_i64(&self) -> Result<i64, RangeError> {
        self.as_big_integer()?
            .to_i64()
            .ok_or(RangeError::OutOfRange { target: "i64" })
    }

    /// Exact when the denominator allows it, otherwise 34 significant digits.
    fn as_extended_decimal(&self) -> ExtendedDecimal {
        self.to_exact_decimal()
            .unwrap_or_else(|| self.to_decimal_rounded(34))
    }

    /// Exact when the denominator allows it, otherwise 113 significant bits.
    fn as_extended_float(&self) -> ExtendedFloat {
        self.to_exact_float()
            .unwrap_or_else(|| self.to_binary_rounded(113))
    }

    fn as_extended_rational(&self) -> ExtendedRational {
        self.clone()
    }

    fn negate(&self) -> Value {
        Value::Rational(self.negated())
    }

    fn abs(&self) -> Value {
        Value::Rational(self.abs_value())
    }

    fn can_fit_in_f32(&self) -> bool {
        if !self.is_finite() {
            return true;
        }
        let native = self.as_f32();
        native.is_finite() && Self::from_f64(f64::from(native)).compare(self) == Ordering::Equal
    }

    fn can_fit_in_f64(&self) -> bool {
        if !self.is_finite() {
            return true;
        }
        let native = self.as_f64();
        native.is_finite() && Self::from_f64(native).compare(self) == Ordering::Equal
    }
}

impl ExtendedRational {
    /// Reduces the quotient to a 66-bit significand plus a sticky bit, then
    /// rounds once into the target format.
    fn to_native<F: Copy + std::ops::Neg<Output = F>>(
        &self,
        nan: F,
        infinity: F,
        convert: impl Fn(bool, &BigUint, i64) -> F,
    ) -> F {
        match self.special {
            Special::NaN => return nan,
            Special::Infinity if self.negative => return -infinity,
            Special::Infinity => return infinity,
            Special::Finite => {}
        }
        if self.numerator.is_zero() {
            return convert(self.negative, &self.numerator, 0);
        }
        let shift = 66 + self.denominator.bits() as i64 - self.numerator.bits() as i64;
        let (num, den) = scale_by_shift(&self.numerator, &self.denominator, shift);
        let (quotient, remainder) = num.div_rem(&den);
        let mut significand = quotient << 1usize;
        if !remainder.is_zero() {
            significand += 1u32;
        }
        convert(self.negative, &significand, -shift - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rational(n: i64, d: i64) -> ExtendedRational {
        ExtendedRational::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let err = ExtendedRational::new(BigInt::from(1), BigInt::zero()).unwrap_err();
        assert_eq!(err, ArgumentError::ZeroDenominator);
    }

    #[test]
    fn test_negative_denominator_moves_sign() {
        let r = rational(3, -4);
        assert_eq!(r.numerator(), BigInt::from(-3));
        assert_eq!(r.denominator(), BigInt::from(4));
        assert_eq!(r.to_string(), "-3/4");
    }

    #[test]
    fn test_to_f64_is_correctly_rounded() {
        assert_eq!(rational(1, 3).as_f64(), 1.0 / 3.0);
        assert_eq!(rational(-2, 3).as_f64(), -2.0 / 3.0);
        assert_eq!(rational(1, 10).as_f32(), 0.1f32);
        assert_eq!(rational(7, 1).as_f64(), 7.0);
    }

    #[test]
    fn test_compare_by_value() {
        assert_eq!(rational(1, 2).compare(&rational(2, 4)), Ordering::Equal);
        assert_eq!(rational(1, 3).compare(&rational(1, 2)), Ordering::Less);
        assert_eq!(rational(-1, 3).compare(&rational(-1, 2)), Ordering::Greater);
        assert_ne!(rational(1, 2), rational(2, 4));
    }

    #[test]
    fn test_exact_conversions() {
        let eighth = rational(3, 8).to_exact_decimal().unwrap();
        assert_eq!(eighth.to_string(), "0.375");
        assert!(rational(1, 3).to_exact_decimal().is_none());
        assert_eq!(rational(1, 3).as_extended_decimal().to_string(), "0.3333333333333333333333333333333333");
        let quarter = rational(1, 4).to_exact_float().unwrap();
        assert_eq!(quarter.as_f64(), 0.25);
    }

    #[test]
    fn test_truncation() {
        assert_eq!(rational(-7, 2).as_i64(), Ok(-3));
        assert!(rational(6, 3).is_integral());
        assert!(!rational(7, 3).is_integral());
        assert_eq!(ExtendedRational::nan().as_i64(), Err(RangeError::NotFinite));
    }

    #[test]
    fn test_remainder() {
        let rem = rational(7, 2).remainder(&rational(1, 1)).unwrap();
        assert_eq!(rem.compare(&rational(1, 2)), Ordering::Equal);
        assert!(rational(1, 2).divide(&rational(0, 1)).is_err());
    }
}
