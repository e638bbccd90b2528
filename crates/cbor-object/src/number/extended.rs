//! Arbitrary-precision numbers of the form `mantissa * RADIX^exponent`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign as BigSign};
use num_integer::Integer;
use num_traits::{Float, One, Signed, ToPrimitive, Zero};

use super::rational::ExtendedRational;
use super::{Numeric, Sign};
use crate::error::RangeError;
use crate::limits::MAX_EXPANSION_EXPONENT;
use crate::model::Value;

/// Finite, infinite or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Special {
    Finite,
    Infinity,
    NaN,
}

/// A number `mantissa * RADIX^exponent` with an arbitrary-precision mantissa
/// and exponent, plus signed infinities, NaN and negative zero.
///
/// Equality is structural: `15 * 10^-1` and `150 * 10^-2` are different
/// values that compare equal with [`ExtendedNumber::compare`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedNumber<const RADIX: u32> {
    negative: bool,
    mantissa: BigUint,
    exponent: BigInt,
    special: Special,
}

/// Base-10 extended number (tags 4 and 264).
pub type ExtendedDecimal = ExtendedNumber<10>;

/// Base-2 extended number (tags 5 and 265).
pub type ExtendedFloat = ExtendedNumber<2>;

impl<const RADIX: u32> ExtendedNumber<RADIX> {
    /// Creates a finite value from a signed mantissa and an exponent.
    pub fn new(mantissa: BigInt, exponent: BigInt) -> Self {
        Self {
            negative: mantissa.sign() == BigSign::Minus,
            mantissa: mantissa.magnitude().clone(),
            exponent,
            special: Special::Finite,
        }
    }

    /// Creates a finite value from its sign, magnitude and exponent.
    /// `negative` with a zero mantissa is negative zero.
    pub fn from_parts(negative: bool, mantissa: BigUint, exponent: BigInt) -> Self {
        Self {
            negative,
            mantissa,
            exponent,
            special: Special::Finite,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(BigInt::from(value), BigInt::zero())
    }

    pub fn from_big_int(value: &BigInt) -> Self {
        Self::new(value.clone(), BigInt::zero())
    }

    pub fn infinity(negative: bool) -> Self {
        Self {
            negative,
            mantissa: BigUint::zero(),
            exponent: BigInt::zero(),
            special: Special::Infinity,
        }
    }

    pub fn nan() -> Self {
        Self {
            negative: false,
            mantissa: BigUint::zero(),
            exponent: BigInt::zero(),
            special: Special::NaN,
        }
    }

    /// Signed mantissa. Zero for infinities and NaN.
    pub fn mantissa(&self) -> BigInt {
        let sign = if self.negative { BigSign::Minus } else { BigSign::Plus };
        BigInt::from_biguint(sign, self.mantissa.clone())
    }

    pub fn unsigned_mantissa(&self) -> &BigUint {
        &self.mantissa
    }

    pub fn exponent(&self) -> &BigInt {
        &self.exponent
    }

    /// True for negative values, negative zero and negative infinity.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_negative_zero(&self) -> bool {
        self.special == Special::Finite && self.negative && self.mantissa.is_zero()
    }

    pub(crate) fn special(&self) -> Special {
        self.special
    }

    fn log2_radix() -> f64 {
        f64::from(RADIX).log2()
    }

    fn radix_pow(exponent: u64) -> BigUint {
        if RADIX == 2 {
            BigUint::one() << exponent as usize
        } else {
            BigUint::from(RADIX).pow(exponent as u32)
        }
    }

    /// The same value with its sign flipped. NaN stays NaN.
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

    /// -1, 0 or 1 for a value that is not NaN.
    fn signum(&self) -> i32 {
        if self.special == Special::Finite && self.mantissa.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    pub(crate) fn approx_log2(&self) -> Option<f64> {
        if self.special != Special::Finite || self.mantissa.is_zero() {
            return None;
        }
        let exponent = self.exponent.to_f64()?;
        Some(self.mantissa.bits() as f64 - 0.5 + exponent * Self::log2_radix())
    }

    /// Total order by value. NaN sorts last and equals NaN.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.special == Special::NaN, other.special == Special::NaN) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }
        let (sa, sb) = (self.signum(), other.signum());
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
            _ => self.compare_magnitude(other),
        };
        if sa < 0 { magnitude.reverse() } else { magnitude }
    }

    /// Compares magnitudes of two finite non-zero values.
    fn compare_magnitude(&self, other: &Self) -> Ordering {
        match self.exponent.cmp(&other.exponent) {
            Ordering::Equal => self.mantissa.cmp(&other.mantissa),
            Ordering::Greater => Self::compare_scaled(self, other),
            Ordering::Less => Self::compare_scaled(other, self).reverse(),
        }
    }

    /// `high` has the larger exponent.
    fn compare_scaled(high: &Self, low: &Self) -> Ordering {
        let diff = &high.exponent - &low.exponent;
        // high >= RADIX^diff * RADIX^low.exponent, low < 2^bits * RADIX^low.exponent
        let needed = (low.mantissa.bits() as f64 / Self::log2_radix()).ceil() as u64;
        if diff > BigInt::from(needed) {
            return Ordering::Greater;
        }
        let diff = diff.to_u64().unwrap_or(needed);
        (&high.mantissa * Self::radix_pow(diff)).cmp(&low.mantissa)
    }

    /// Exact value as a rational. Exponents beyond the expansion limit
    /// saturate to infinity or zero.
    pub fn to_rational(&self) -> ExtendedRational {
        match self.special {
            Special::NaN => return ExtendedRational::nan(),
            Special::Infinity => return ExtendedRational::infinity(self.negative),
            Special::Finite => {}
        }
        if self.exponent.is_negative() {
            match (-&self.exponent).to_u64().filter(|e| *e <= MAX_EXPANSION_EXPONENT) {
                Some(k) => ExtendedRational::from_parts(
                    self.negative,
                    self.mantissa.clone(),
                    Self::radix_pow(k),
                ),
                None => ExtendedRational::from_parts(self.negative, BigUint::zero(), BigUint::one()),
            }
        } else {
            match self.exponent.to_u64().filter(|e| *e <= MAX_EXPANSION_EXPONENT) {
                Some(e) => ExtendedRational::from_parts(
                    self.negative,
                    &self.mantissa * Self::radix_pow(e),
                    BigUint::one(),
                ),
                None if self.mantissa.is_zero() => ExtendedRational::from_parts(
                    self.negative,
                    BigUint::zero(),
                    BigUint::one(),
                ),
                None => ExtendedRational::infinity(self.negative),
            }
        }
    }

    /// Exact product.
    pub fn multiply(&self, other: &Self) -> Self {
        Self::from_parts(
            self.negative != other.negative,
            &self.mantissa * &other.mantissa,
            &self.exponent + &other.exponent,
        )
    }

    /// Exact sum. Fails when aligning the exponents would need an
    /// expansion beyond the limit.
    pub fn add(&self, other: &Self) -> Result<Self, RangeError> {
        let exponent = (&self.exponent).min(&other.exponent).clone();
        let align = |n: &Self| -> Result<BigInt, RangeError> {
            let shift = (&n.exponent - &exponent)
                .to_u64()
                .filter(|s| *s <= MAX_EXPANSION_EXPONENT)
                .ok_or(RangeError::OutOfRange { target: "exact sum" })?;
            Ok(n.mantissa() * BigInt::from(Self::radix_pow(shift)))
        };
        let sum = align(self)? + align(other)?;
        Ok(Self::new(sum, exponent))
    }

    fn base_is_integral(&self) -> bool {
        if self.special != Special::Finite {
            return false;
        }
        if self.mantissa.is_zero() || !self.exponent.is_negative() {
            return true;
        }
        let Some(k) = (-&self.exponent).to_u64() else {
            return false;
        };
        if RADIX == 2 {
            return self.mantissa.trailing_zeros().is_some_and(|tz| tz >= k);
        }
        if k as f64 * Self::log2_radix() > self.mantissa.bits() as f64 {
            return false;
        }
        (&self.mantissa % Self::radix_pow(k)).is_zero()
    }

    fn base_as_big_integer(&self) -> Result<BigInt, RangeError> {
        if self.special != Special::Finite {
            return Err(RangeError::NotFinite);
        }
        let magnitude = if self.mantissa.is_zero() {
            BigUint::zero()
        } else if self.exponent.is_negative() {
            let k = (-&self.exponent).to_u64().unwrap_or(u64::MAX);
            if k as f64 * Self::log2_radix() >= self.mantissa.bits() as f64 + 1.0 {
                BigUint::zero()
            } else {
                &self.mantissa / Self::radix_pow(k)
            }
        } else {
            let e = self
                .exponent
                .to_u64()
                .filter(|e| *e <= MAX_EXPANSION_EXPONENT)
                .ok_or(RangeError::OutOfRange { target: "BigInt" })?;
            &self.mantissa * Self::radix_pow(e)
        };
        let sign = if self.negative { BigSign::Minus } else { BigSign::Plus };
        Ok(BigInt::from_biguint(sign, magnitude))
    }

    fn base_as_i64(&self) -> Result<i64, RangeError> {
        if self.special != Special::Finite {
            return Err(RangeError::NotFinite);
        }
        if let Some(log2) = self.approx_log2() {
            if log2 > 66.0 {
                return Err(RangeError::OutOfRange { target: "i64" });
            }
        }
        self.base_as_big_integer()?
            .to_i64()
            .ok_or(RangeError::OutOfRange { target: "i64" })
    }

    fn to_native<F: Float + FromStr>(&self) -> F {
        match self.special {
            Special::NaN => return F::nan(),
            Special::Infinity if self.negative => return F::neg_infinity(),
            Special::Infinity => return F::infinity(),
            Special::Finite => {}
        }
        if RADIX == 10 {
            decimal_to_native(self.negative, &self.mantissa, &self.exponent)
        } else {
            match self.exponent.to_i64() {
                Some(e) => binary_to_native(self.negative, &self.mantissa, e),
                None => signed_limit(self.negative, !self.exponent.is_negative() && !self.mantissa.is_zero()),
            }
        }
    }
}

fn signed_limit<F: Float>(negative: bool, overflow: bool) -> F {
    match (negative, overflow) {
        (false, true) => F::infinity(),
        (true, true) => F::neg_infinity(),
        (false, false) => F::zero(),
        (true, false) => F::neg_zero(),
    }
}

/// Correctly rounded conversion of `±mantissa * 10^exponent`.
pub(crate) fn decimal_to_native<F: Float + FromStr>(
    negative: bool,
    mantissa: &BigUint,
    exponent: &BigInt,
) -> F {
    if mantissa.is_zero() {
        return signed_limit(negative, false);
    }
    let digits = mantissa.to_string();
    let adjusted = exponent + BigInt::from(digits.len() - 1);
    if adjusted > BigInt::from(400) {
        return signed_limit(negative, true);
    }
    if adjusted < BigInt::from(-400) {
        return signed_limit(negative, false);
    }
    let text = format!("{}{}e{}", if negative { "-" } else { "" }, digits, exponent);
    text.parse::<F>().unwrap_or_else(|_| F::nan())
}

/// Correctly rounded conversion of `±mantissa * 2^exponent`.
pub(crate) fn binary_to_native<F: Float + FromStr>(negative: bool, mantissa: &BigUint, exponent: i64) -> F {
    if mantissa.is_zero() {
        return signed_limit(negative, false);
    }
    let bits = mantissa.bits();
    let top = exponent.saturating_add(bits as i64);
    if top > 1100 {
        return signed_limit(negative, true);
    }
    if top < -1200 {
        return signed_limit(negative, false);
    }
    let (mut m, mut e) = (mantissa.clone(), exponent);
    if bits > 64 {
        // keep 64 significant bits plus a sticky bit for the discarded tail
        let shift = bits - 64;
        let sticky = m.trailing_zeros().is_some_and(|tz| tz < shift);
        m >>= shift as usize;
        m <<= 1usize;
        if sticky {
            m += 1u32;
        }
        e += shift as i64 - 1;
    }
    let (digits, scale) = if e >= 0 {
        (m << e as usize, 0i64)
    } else {
        (m * BigUint::from(5u32).pow((-e) as u32), e)
    };
    decimal_to_native(negative, &digits, &BigInt::from(scale))
}

impl ExtendedNumber<2> {
    /// Exact binary value of a double.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::nan();
        }
        if value.is_infinite() {
            return Self::infinity(value < 0.0);
        }
        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << 52) - 1);
        let (mantissa, exponent) = if biased == 0 {
            (fraction, -1074)
        } else {
            (fraction | (1u64 << 52), biased - 1075)
        };
        if mantissa == 0 {
            return Self::from_parts(negative, BigUint::zero(), BigInt::zero());
        }
        let tz = mantissa.trailing_zeros();
        Self::from_parts(
            negative,
            BigUint::from(mantissa >> tz),
            BigInt::from(exponent + i64::from(tz)),
        )
    }

    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// Exact decimal value. Exponents beyond the expansion limit saturate.
    pub fn to_decimal(&self) -> ExtendedDecimal {
        match self.special {
            Special::NaN => return ExtendedDecimal::nan(),
            Special::Infinity => return ExtendedDecimal::infinity(self.negative),
            Special::Finite => {}
        }
        if self.mantissa.is_zero() {
            return ExtendedDecimal::from_parts(self.negative, BigUint::zero(), BigInt::zero());
        }
        if self.exponent.is_negative() {
            match (-&self.exponent).to_u64().filter(|k| *k <= MAX_EXPANSION_EXPONENT) {
                Some(k) => ExtendedDecimal::from_parts(
                    self.negative,
                    &self.mantissa * BigUint::from(5u32).pow(k as u32),
                    self.exponent.clone(),
                ),
                None => ExtendedDecimal::from_parts(self.negative, BigUint::zero(), BigInt::zero()),
            }
        } else {
            match self.exponent.to_u64().filter(|e| *e <= MAX_EXPANSION_EXPONENT) {
                Some(e) => ExtendedDecimal::from_parts(
                    self.negative,
                    &self.mantissa << e as usize,
                    BigInt::zero(),
                ),
                None => ExtendedDecimal::infinity(self.negative),
            }
        }
    }

    pub fn to_float(&self) -> ExtendedFloat {
        self.clone()
    }
}

impl ExtendedNumber<10> {
    /// Exact decimal value of a double.
    pub fn from_f64(value: f64) -> Self {
        ExtendedFloat::from_f64(value).to_decimal()
    }

    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }

    pub fn to_decimal(&self) -> ExtendedDecimal {
        self.clone()
    }

    /// Binary value, exact when possible and otherwise rounded half-even to
    /// 113 significant bits.
    pub fn to_float(&self) -> ExtendedFloat {
        match self.special {
            Special::NaN => return ExtendedFloat::nan(),
            Special::Infinity => return ExtendedFloat::infinity(self.negative),
            Special::Finite => {}
        }
        if self.mantissa.is_zero() {
            return ExtendedFloat::from_parts(self.negative, BigUint::zero(), BigInt::zero());
        }
        if !self.exponent.is_negative() {
            return match self.exponent.to_u64().filter(|e| *e <= MAX_EXPANSION_EXPONENT) {
                // 10^e = 5^e * 2^e
                Some(e) => ExtendedFloat::from_parts(
                    self.negative,
                    &self.mantissa * BigUint::from(5u32).pow(e as u32),
                    self.exponent.clone(),
                ),
                None => ExtendedFloat::infinity(self.negative),
            };
        }
        let rational = self.to_rational();
        rational
            .to_exact_float()
            .unwrap_or_else(|| rational.to_binary_rounded(113))
    }
}

/// Writes the decimal in plain notation when the exponent is non-positive
/// and the adjusted exponent is at least -6, otherwise in scientific notation.
impl fmt::Display for ExtendedNumber<10> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.special {
            Special::NaN => return f.write_str("NaN"),
            Special::Infinity if self.negative => return f.write_str("-Infinity"),
            Special::Infinity => return f.write_str("Infinity"),
            Special::Finite => {}
        }
        if self.negative {
            f.write_str("-")?;
        }
        let digits = self.mantissa.to_string();
        let len = digits.len() as i64;
        let adjusted = &self.exponent + BigInt::from(len - 1);
        if !self.exponent.is_positive() && adjusted >= BigInt::from(-6) {
            // exponent is within [-(len + 5), 0] here
            let e = self.exponent.to_i64().unwrap_or(0);
            if e == 0 {
                return f.write_str(&digits);
            }
            let point = len + e;
            if point > 0 {
                let (int, frac) = digits.split_at(point as usize);
                write!(f, "{}.{}", int, frac)
            } else {
                write!(f, "0.{}{}", "0".repeat((-point) as usize), digits)
            }
        } else {
            let (first, rest) = digits.split_at(1);
            f.write_str(first)?;
            if !rest.is_empty() {
                write!(f, ".{}", rest)?;
            }
            if adjusted.is_negative() {
                write!(f, "E{}", adjusted)
            } else {
                write!(f, "E+{}", adjusted)
            }
        }
    }
}

impl fmt::Display for ExtendedNumber<2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_decimal(), f)
    }
}

macro_rules! impl_numeric {
    ($ty:ty, $variant:ident) => {
        impl Numeric for $ty {
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
                self.special == Special::Finite && self.mantissa.is_zero()
            }

            fn sign(&self) -> Sign {
                match self.special {
                    Special::NaN => Sign::Unordered,
                    Special::Infinity => Sign::of(self.negative, false),
                    Special::Finite => Sign::of(self.negative, self.mantissa.is_zero()),
                }
            }

            fn is_integral(&self) -> bool {
                self.base_is_integral()
            }

            fn as_f64(&self) -> f64 {
                self.to_native::<f64>()
            }

            fn as_f32(&self) -> f32 {
                self.to_native::<f32>()
            }

            fn as_big_integer(&self) -> Result<BigInt, RangeError> {
                self.base_as_big_integer()
            }

            fn as_i64(&self) -> Result<i64, RangeError> {
                self.base_as_i64()
            }

            fn as_extended_decimal(&self) -> ExtendedDecimal {
                self.to_decimal()
            }

            fn as_extended_float(&self) -> ExtendedFloat {
                self.to_float()
            }

            fn as_extended_rational(&self) -> ExtendedRational {
                self.to_rational()
            }

            fn negate(&self) -> Value {
                Value::$variant(self.negated())
            }

            fn abs(&self) -> Value {
                Value::$variant(self.abs_value())
            }

            fn can_fit_in_f32(&self) -> bool {
                if !self.is_finite() {
                    return true;
                }
                let native = self.as_f32();
                native.is_finite() && <$ty>::from_f32(native).compare(self) == Ordering::Equal
            }

            fn can_fit_in_f64(&self) -> bool {
                if !self.is_finite() {
                    return true;
                }
                let native = self.as_f64();
                native.is_finite() && <$ty>::from_f64(native).compare(self) == Ordering::Equal
            }
        }
    };
}

impl_numeric!(ExtendedDecimal, Decimal);
impl_numeric!(ExtendedFloat, Float);

/// Rounds `value / divisor` half-even; `sticky` marks a non-zero tail
/// already dropped from `value`.
pub(crate) fn round_half_even(value: &BigUint, divisor: &BigUint, sticky: bool) -> BigUint {
    let (quotient, remainder) = value.div_rem(divisor);
    let twice = remainder << 1usize;
    match twice.cmp(divisor) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1u32,
        Ordering::Equal if sticky || quotient.is_odd() => quotient + 1u32,
        Ordering::Equal => quotient,
    }
}
