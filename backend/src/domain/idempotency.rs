//! Idempotency key validation for order creation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::OrderNumber;

/// Maximum accepted key length in characters.
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 255;

/// Validation errors for [`IdempotencyKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdempotencyKeyValidationError {
    /// The key string was empty.
    #[error("idempotency key must not be empty")]
    EmptyKey,
    /// The key carried leading or trailing whitespace.
    #[error("idempotency key must not contain surrounding whitespace")]
    Untrimmed,
    /// The key exceeded [`MAX_IDEMPOTENCY_KEY_LEN`].
    #[error("idempotency key must be at most {MAX_IDEMPOTENCY_KEY_LEN} characters")]
    TooLong,
}

/// Caller-supplied token that deduplicates retried order submissions.
///
/// Keys are opaque: clients may send UUIDs, request hashes, or any other
/// string. When a caller omits a key the generated order number is stored in
/// its place, so every persisted order carries one.
///
/// # Example
///
/// ```
/// # use commerce::domain::IdempotencyKey;
/// let key = IdempotencyKey::new("checkout-7f3a").expect("valid key");
/// assert_eq!(key.as_ref(), "checkout-7f3a");
/// assert!(IdempotencyKey::new(" padded ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate and construct an [`IdempotencyKey`].
    pub fn new(key: impl Into<String>) -> Result<Self, IdempotencyKeyValidationError> {
        let key = key.into();
        if key.is_empty() {
            return Err(IdempotencyKeyValidationError::EmptyKey);
        }
        if key.trim() != key {
            return Err(IdempotencyKeyValidationError::Untrimmed);
        }
        if key.chars().count() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(IdempotencyKeyValidationError::TooLong);
        }
        Ok(Self(key))
    }

    /// Use an order number as the de-facto key for keyless submissions.
    pub fn from_order_number(number: &OrderNumber) -> Self {
        Self(number.as_ref().to_owned())
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = IdempotencyKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
