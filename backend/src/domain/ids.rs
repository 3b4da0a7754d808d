//! Strongly typed identifiers for commerce aggregates.
//!
//! Every identifier wraps a UUID and serialises as its hyphenated string
//! form. Parsing rejects untrimmed or malformed input so identifiers that
//! reach the domain are always canonical.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// Validation error for identifier parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdValidationError {
    /// The identifier string was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Identifier kind, e.g. `order id`.
        kind: &'static str,
    },
    /// The identifier string was not a valid UUID.
    #[error("{kind} must be a valid UUID, got {input:?}")]
    Invalid {
        /// Identifier kind, e.g. `order id`.
        kind: &'static str,
        /// Rejected input.
        input: String,
    },
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident => $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            /// Validate and construct the identifier from a string.
            pub fn new(id: impl AsRef<str>) -> Result<Self, IdValidationError> {
                let raw = id.as_ref();
                if raw.is_empty() {
                    return Err(IdValidationError::Empty { kind: $kind });
                }
                if raw.trim() != raw {
                    return Err(IdValidationError::Invalid {
                        kind: $kind,
                        input: raw.to_owned(),
                    });
                }
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| IdValidationError::Invalid {
                        kind: $kind,
                        input: raw.to_owned(),
                    })
            }

            /// Wrap an already validated UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0.to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a shop.
    ShopId => "shop id"
);
define_entity_id!(
    /// Identifier of a catalog product.
    ProductId => "product id"
);
define_entity_id!(
    /// Identifier of a purchasable product variant.
    VariantId => "variant id"
);
define_entity_id!(
    /// Identifier of a shopping cart.
    CartId => "cart id"
);
define_entity_id!(
    /// Identifier of a line inside a cart.
    CartLineId => "cart line id"
);
define_entity_id!(
    /// Identifier of an order.
    OrderId => "order id"
);
define_entity_id!(
    /// Identifier of a line inside an order.
    OrderLineId => "order line id"
);
define_entity_id!(
    /// Identifier of a fulfilment (one shipment).
    FulfilmentId => "fulfilment id"
);
define_entity_id!(
    /// Identifier of a line inside a fulfilment.
    FulfilmentLineId => "fulfilment line id"
);
define_entity_id!(
    /// Identifier of the customer profile owning a cart or order.
    ProfileId => "profile id"
);
define_entity_id!(
    /// Identifier of the contact attached to a cart or order.
    ContactId => "contact id"
);
define_entity_id!(
    /// Identifier of the delivery address attached to an order.
    AddressId => "address id"
);

#[cfg(test)]
mod tests {
    //! Regression coverage for identifier parsing.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_canonical_uuid() {
        let raw = "550e8400-e29b-41d4-a716-446655440000";
        let id = OrderId::new(raw).expect("valid id");
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case(" 550e8400-e29b-41d4-a716-446655440000")]
    #[case("not-a-uuid")]
    fn rejects_malformed_input(#[case] raw: &str) {
        assert!(VariantId::new(raw).is_err());
    }

    #[rstest]
    fn error_names_identifier_kind() {
        let error = CartId::new("nope").expect_err("invalid");
        assert!(error.to_string().starts_with("cart id"));
    }

    #[rstest]
    fn serde_uses_string_form() {
        let id = ShopId::random();
        let json = serde_json::to_string(&id).expect("serialise");
        assert_eq!(json, format!("\"{id}\""));
        let back: ShopId = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, id);
    }
}
