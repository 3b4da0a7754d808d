//! Fixed-point money values.
//!
//! A [`Money`] value is a currency code plus whole `units` and fractional
//! `nanos` (10^-9 of a unit). Arithmetic is exact: every operation computes
//! wide intermediates and carries nanos overflow into units once, so every
//! value handed back is already normalised.
//!
//! ## Invariants
//! - `0 <= |nanos| < 1_000_000_000`.
//! - `nanos` is zero or has the same sign as `units`.
//! - Values of different currencies are never combined.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of nanos in one whole unit.
pub const NANOS_PER_UNIT: i64 = 1_000_000_000;

/// Maximum number of fractional digits accepted when parsing decimals.
const MAX_FRACTION_DIGITS: usize = 9;

/// Errors raised while constructing or combining money values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The currency code is not three ASCII uppercase letters.
    #[error("currency code must be three uppercase ASCII letters, got {code:?}")]
    InvalidCurrency {
        /// Rejected input.
        code: String,
    },
    /// `nanos` was outside `(-10^9, 10^9)`.
    #[error("nanos must satisfy |nanos| < 1000000000, got {nanos}")]
    NanosOutOfRange {
        /// Rejected nanos value.
        nanos: i32,
    },
    /// `units` and `nanos` carried opposite signs.
    #[error("units ({units}) and nanos ({nanos}) must share a sign")]
    SignMismatch {
        /// Units component.
        units: i64,
        /// Nanos component.
        nanos: i32,
    },
    /// Two values with different currencies were combined.
    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Currency of the accumulator.
        expected: CurrencyCode,
        /// Currency of the value being added.
        actual: CurrencyCode,
    },
    /// The result does not fit in 64-bit units.
    #[error("money arithmetic overflowed")]
    Overflow,
    /// A decimal amount string could not be parsed.
    #[error("invalid decimal amount {input:?}")]
    InvalidAmount {
        /// Rejected input.
        input: String,
    },
}

/// ISO 4217 style currency code.
///
/// # Examples
/// ```
/// use commerce::domain::CurrencyCode;
///
/// let usd = CurrencyCode::new("USD").expect("valid code");
/// assert_eq!(usd.as_str(), "USD");
/// assert!(CurrencyCode::new("usd").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Validate and construct a currency code.
    pub fn new(code: impl AsRef<str>) -> Result<Self, MoneyError> {
        let raw = code.as_ref();
        let invalid = || MoneyError::InvalidCurrency {
            code: raw.to_owned(),
        };
        let bytes: [u8; 3] = raw.as_bytes().try_into().map_err(|_| invalid())?;
        if !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII uppercase bytes.
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_owned()
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Exact monetary amount in a single currency.
///
/// # Examples
/// ```
/// use commerce::domain::Money;
///
/// let price = Money::new("USD", 10, 500_000_000).expect("valid price");
/// let total = price.checked_mul(2).expect("no overflow");
/// assert_eq!((total.units(), total.nanos()), (21, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyDto", into = "MoneyDto")]
pub struct Money {
    currency: CurrencyCode,
    units: i64,
    nanos: i32,
}

impl Money {
    /// Validate and construct a money value.
    pub fn new(currency: impl AsRef<str>, units: i64, nanos: i32) -> Result<Self, MoneyError> {
        Self::from_parts(CurrencyCode::new(currency)?, units, nanos)
    }

    /// Construct a money value from an already validated currency code.
    pub fn from_parts(currency: CurrencyCode, units: i64, nanos: i32) -> Result<Self, MoneyError> {
        if i64::from(nanos).abs() >= NANOS_PER_UNIT {
            return Err(MoneyError::NanosOutOfRange { nanos });
        }
        if (units > 0 && nanos < 0) || (units < 0 && nanos > 0) {
            return Err(MoneyError::SignMismatch { units, nanos });
        }
        Ok(Self {
            currency,
            units,
            nanos,
        })
    }

    /// Zero in the given currency.
    pub fn zero(currency: CurrencyCode) -> Self {
        Self {
            currency,
            units: 0,
            nanos: 0,
        }
    }

    /// Parse a decimal amount such as `10.50` or `-0.25`.
    ///
    /// At most nine fractional digits are accepted.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::{CurrencyCode, Money};
    ///
    /// let usd = CurrencyCode::new("USD").expect("valid code");
    /// let price = Money::parse_decimal(usd, "10.50").expect("valid amount");
    /// assert_eq!((price.units(), price.nanos()), (10, 500_000_000));
    /// ```
    pub fn parse_decimal(currency: CurrencyCode, input: &str) -> Result<Self, MoneyError> {
        let invalid = || MoneyError::InvalidAmount {
            input: input.to_owned(),
        };
        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty()
            || !all_digits(whole)
            || !all_digits(fraction)
            || fraction.len() > MAX_FRACTION_DIGITS
            || (digits.contains('.') && fraction.is_empty())
        {
            return Err(invalid());
        }

        let units: i64 = whole.parse().map_err(|_| invalid())?;
        let padded = format!("{fraction:0<width$}", width = MAX_FRACTION_DIGITS);
        let nanos: i32 = padded.parse().map_err(|_| invalid())?;

        if negative {
            Self::from_parts(currency, -units, -nanos)
        } else {
            Self::from_parts(currency, units, nanos)
        }
    }

    /// Currency code of the value.
    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Whole units.
    pub fn units(&self) -> i64 {
        self.units
    }

    /// Fractional nanos.
    pub fn nanos(&self) -> i32 {
        self.nanos
    }

    /// Return `true` when the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.units < 0 || self.nanos < 0
    }

    /// Add two values of the same currency, carrying nanos into units.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                expected: self.currency,
                actual: other.currency,
            });
        }
        let units = self
            .units
            .checked_add(other.units)
            .ok_or(MoneyError::Overflow)?;
        let nanos = i64::from(self.nanos) + i64::from(other.nanos);
        normalise(self.currency, units, nanos)
    }

    /// Multiply by an integer quantity.
    ///
    /// `units * quantity` and `nanos * quantity` are computed independently
    /// as 64-bit values and the nanos overflow is carried into units once.
    pub fn checked_mul(&self, quantity: i64) -> Result<Self, MoneyError> {
        let units = self
            .units
            .checked_mul(quantity)
            .ok_or(MoneyError::Overflow)?;
        let nanos = i64::from(self.nanos)
            .checked_mul(quantity)
            .ok_or(MoneyError::Overflow)?;
        normalise(self.currency, units, nanos)
    }
}

/// Carry whole units out of `nanos` and align the signs of both parts.
fn normalise(currency: CurrencyCode, units: i64, nanos: i64) -> Result<Money, MoneyError> {
    let carry = nanos / NANOS_PER_UNIT;
    let mut remainder = nanos % NANOS_PER_UNIT;
    let mut units = units.checked_add(carry).ok_or(MoneyError::Overflow)?;

    if units > 0 && remainder < 0 {
        units -= 1;
        remainder += NANOS_PER_UNIT;
    } else if units < 0 && remainder > 0 {
        units += 1;
        remainder -= NANOS_PER_UNIT;
    }

    let nanos = i32::try_from(remainder).map_err(|_| MoneyError::Overflow)?;
    Money::from_parts(currency, units, nanos)
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let fraction = format!("{:09}", self.nanos.unsigned_abs());
        let trimmed = fraction.trim_end_matches('0');
        let shown = if trimmed.len() < 2 {
            fraction.get(..2).unwrap_or("00")
        } else {
            trimmed
        };
        write!(
            f,
            "{sign}{}.{shown} {}",
            self.units.unsigned_abs(),
            self.currency
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoneyDto {
    currency: String,
    units: i64,
    nanos: i32,
}

impl From<Money> for MoneyDto {
    fn from(value: Money) -> Self {
        Self {
            currency: value.currency.into(),
            units: value.units,
            nanos: value.nanos,
        }
    }
}

impl TryFrom<MoneyDto> for Money {
    type Error = MoneyError;

    fn try_from(value: MoneyDto) -> Result<Self, Self::Error> {
        Self::new(value.currency, value.units, value.nanos)
    }
}
