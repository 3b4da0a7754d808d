//! Shop slug validation and derivation.
//!
//! Slugs are trimmed, non-empty identifiers composed of lowercase ASCII
//! letters, digits, and hyphens.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors for [`ShopSlug`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugValidationError {
    /// The slug was empty.
    #[error("slug must not be empty")]
    Empty,
    /// The slug contained characters outside `[a-z0-9-]`.
    #[error("slug {slug:?} may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacters {
        /// Rejected slug.
        slug: String,
    },
}

/// URL-safe unique handle of a shop.
///
/// # Examples
/// ```
/// use commerce::domain::ShopSlug;
///
/// let slug = ShopSlug::derive_from_name("Coffee Corner").expect("derivable");
/// assert_eq!(slug.as_ref(), "coffee-corner");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopSlug(String);

impl ShopSlug {
    /// Validate an explicit slug.
    pub fn new(slug: impl Into<String>) -> Result<Self, SlugValidationError> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(SlugValidationError::Empty);
        }
        if !is_valid_slug(&slug) {
            return Err(SlugValidationError::InvalidCharacters { slug });
        }
        Ok(Self(slug))
    }

    /// Derive a slug from a display name by lower-casing it and replacing
    /// spaces with hyphens.
    pub fn derive_from_name(name: &str) -> Result<Self, SlugValidationError> {
        Self::new(name.trim().to_lowercase().replace(' ', "-"))
    }
}

impl AsRef<str> for ShopSlug {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ShopSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<ShopSlug> for String {
    fn from(value: ShopSlug) -> Self {
        value.0
    }
}

impl TryFrom<String> for ShopSlug {
    type Error = SlugValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

fn is_valid_slug(value: &str) -> bool {
    is_trimmed_non_empty(value) && has_allowed_slug_chars(value)
}

fn is_trimmed_non_empty(value: &str) -> bool {
    !value.is_empty() && value.trim() == value
}

fn has_allowed_slug_chars(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
}
