//! Positive item quantities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors for [`Quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// The quantity was zero or negative.
    #[error("quantity must be positive, got {value}")]
    NotPositive {
        /// Rejected value.
        value: i64,
    },
    /// Summing two quantities overflowed.
    #[error("quantity overflowed")]
    Overflow,
}

/// Strictly positive count of items on a cart, order, or fulfilment line.
///
/// # Examples
/// ```
/// use commerce::domain::Quantity;
///
/// let two = Quantity::new(2).expect("positive");
/// let five = two.checked_add(Quantity::new(3).expect("positive")).expect("no overflow");
/// assert_eq!(five.get(), 5);
/// assert!(Quantity::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    /// Validate and construct a quantity.
    pub const fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 {
            return Err(QuantityError::NotPositive { value });
        }
        Ok(Self(value))
    }

    /// Raw value.
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Sum two quantities.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(QuantityError::Overflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
