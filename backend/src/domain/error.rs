//! Domain-level error types.
//!
//! These errors are transport agnostic. Adapters (the operator CLI, or any
//! future RPC surface) map them onto their own envelopes using the stable
//! [`ErrorCode`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// A referenced shop, variant, cart, order, or fulfilment does not exist.
    NotFound,
    /// The current state of an aggregate forbids the operation.
    FailedPrecondition,
    /// A unique key (shop slug, variant SKU) is already taken.
    AlreadyExists,
    /// A driven adapter could not be reached.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain or an adapter.
    InternalError,
}

impl ErrorCode {
    /// Return the wire representation of the code.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::ErrorCode;
    ///
    /// assert_eq!(ErrorCode::FailedPrecondition.as_str(), "failed_precondition");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::FailedPrecondition => "failed_precondition",
            Self::AlreadyExists => "already_exists",
            Self::ServiceUnavailable => "service_unavailable",
            Self::InternalError => "internal_error",
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use commerce::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "order missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
#[error("{}: {message}", .code.as_str())]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

/// Why [`Error::try_new`] refused a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    /// The message was empty or whitespace only.
    #[error("error message must not be empty")]
    EmptyMessage,
}

impl Error {
    /// Create a new error, substituting the code name for a blank message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::try_new(code, message).unwrap_or_else(|_| Self {
            code,
            message: code.as_str().to_owned(),
            details: None,
        })
    }

    /// Create an error, rejecting a blank message.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            Err(ErrorValidationError::EmptyMessage)
        } else {
            Ok(Self {
                code,
                message,
                details: None,
            })
        }
    }

    /// Failure category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Operator-facing description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured context such as the offending variant or line.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Replace the structured context.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::{Error, ErrorCode};
    /// use serde_json::json;
    ///
    /// let err = Error::new(ErrorCode::FailedPrecondition, "insufficient stock")
    ///     .with_details(json!({ "requested": 5, "available": 2 }));
    /// assert!(err.details().is_some());
    /// ```
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Shorthand for an [`ErrorCode::InvalidRequest`] error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Shorthand for an [`ErrorCode::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Shorthand for an [`ErrorCode::FailedPrecondition`] error.
    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedPrecondition, message)
    }

    /// Shorthand for an [`ErrorCode::AlreadyExists`] error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    /// Shorthand for an [`ErrorCode::ServiceUnavailable`] error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Shorthand for an [`ErrorCode::InternalError`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let error = Self::try_new(value.code, value.message)?;
        Ok(match value.details {
            Some(details) => error.with_details(details),
            None => error,
        })
    }
}
