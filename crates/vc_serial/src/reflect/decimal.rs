use alloc::string::String;
use core::fmt;
use core::str::FromStr;

use thiserror::Error;

const MAX_SCALE: u32 = 28;
const MANTISSA_MAX: u128 = (1 << 96) - 1;
const SIGN_BIT: u32 = 1 << 31;

/// A 128-bit decimal floating point value: a 96-bit mantissa, a sign and a
/// power-of-ten scale in `0..=28`.
///
/// Only storage and text conversion are provided, the engine never does
/// arithmetic on it.
///
/// ```
/// use vc_serial::reflect::Decimal;
///
/// let d: Decimal = "-12.50".parse().unwrap();
/// assert_eq!(d.mantissa(), -1250);
/// assert_eq!(d.scale(), 2);
/// assert_eq!(d.to_string(), "-12.50");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    lo: u32,
    mid: u32,
    hi: u32,
    flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal `{0}`")]
pub struct ParseDecimalError(String);

impl Decimal {
    pub const ZERO: Self = Self {
        lo: 0,
        mid: 0,
        hi: 0,
        flags: 0,
    };

    /// Creates `mantissa * 10^-scale`.
    ///
    /// Returns `None` if the mantissa exceeds 96 bits or the scale exceeds 28.
    pub fn new(mantissa: i128, scale: u32) -> Option<Self> {
        let magnitude = mantissa.unsigned_abs();
        if magnitude > MANTISSA_MAX || scale > MAX_SCALE {
            return None;
        }
        let sign = if mantissa < 0 { SIGN_BIT } else { 0 };
        Some(Self {
            lo: magnitude as u32,
            mid: (magnitude >> 32) as u32,
            hi: (magnitude >> 64) as u32,
            flags: sign | (scale << 16),
        })
    }

    /// The raw `lo, mid, hi, flags` words, as stored on the wire.
    #[inline]
    pub const fn to_bits(self) -> [u32; 4] {
        [self.lo, self.mid, self.hi, self.flags]
    }

    /// Rebuilds a value from [`Decimal::to_bits`].
    ///
    /// Unused flag bits are cleared and an out of range scale is clamped.
    pub fn from_bits(bits: [u32; 4]) -> Self {
        let scale = ((bits[3] >> 16) & 0xFF).min(MAX_SCALE);
        Self {
            lo: bits[0],
            mid: bits[1],
            hi: bits[2],
            flags: (bits[3] & SIGN_BIT) | (scale << 16),
        }
    }

    pub fn mantissa(&self) -> i128 {
        let magnitude =
            (u128::from(self.hi) << 64) | (u128::from(self.mid) << 32) | u128::from(self.lo);
        // 96 bits always fit.
        let magnitude = magnitude as i128;
        if self.is_sign_negative() { -magnitude } else { magnitude }
    }

    #[inline]
    pub fn scale(&self) -> u32 {
        (self.flags >> 16) & 0xFF
    }

    #[inline]
    pub fn is_sign_negative(&self) -> bool {
        self.flags & SIGN_BIT != 0
    }

    /// Nearest `f64`.
    pub fn to_f64(&self) -> f64 {
        self.mantissa() as f64 / 10f64.powi(self.scale() as i32)
    }

    /// Converts through the shortest decimal text of `value`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        alloc::format!("{value}").parse().ok()
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(String::from(s));
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }

        let mut mantissa: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(err)?;
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(d)))
                .ok_or_else(err)?;
        }
        if negative {
            mantissa = -mantissa;
        }
        Self::new(mantissa, frac_part.len() as u32).ok_or_else(err)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = alloc::format!("{}", self.mantissa().unsigned_abs());
        let scale = self.scale() as usize;
        if self.is_sign_negative() {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{int_part}.{frac_part}")
        } else {
            write!(f, "0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({self})")
    }
}
