//! Closed status enumerations for carts, orders, payments, and fulfilments.
//!
//! Statuses are persisted as lowercase strings via [`as_str`](CartStatus::as_str)
//! and parsed back with [`FromStr`]; unknown strings are rejected instead of
//! being mapped to a default.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} {input:?}; expected one of: {expected}")]
pub struct ParseStatusError {
    /// Status family, e.g. `order status`.
    pub kind: &'static str,
    /// The rejected input.
    pub input: String,
    /// Comma-separated list of accepted values.
    pub expected: String,
}

macro_rules! define_status {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$variant_meta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$variant_meta])* $variant, )+
        }

        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the persisted string representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|status| status.as_str() == s)
                    .ok_or_else(|| ParseStatusError {
                        kind: $kind,
                        input: s.to_owned(),
                        expected: Self::ALL
                            .iter()
                            .map(Self::as_str)
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
        }
    };
}

define_status! {
    /// Lifecycle of a cart.
    CartStatus ("cart status") {
        /// Lines may be added and removed.
        Active => "active",
        /// An order was created from the cart; terminal.
        Converted => "converted",
        /// The cart was given up; terminal.
        Abandoned => "abandoned",
    }
}

define_status! {
    /// Lifecycle of an order.
    OrderStatus ("order status") {
        /// Stock reserved and prices captured.
        Confirmed => "confirmed",
        /// Every line has been fully fulfilled; terminal.
        Fulfilled => "fulfilled",
        /// Cancelled before any fulfilment; terminal.
        Cancelled => "cancelled",
    }
}

define_status! {
    /// Payment progress tracked on an order. No charging happens here.
    PaymentStatus ("payment status") {
        /// Awaiting payment.
        Pending => "pending",
        /// Payment captured by an external system.
        Paid => "paid",
        /// Payment returned to the customer.
        Refunded => "refunded",
    }
}

define_status! {
    /// Shipment progress of a fulfilment, also used as the order-level
    /// fulfilment summary.
    FulfilmentStatus ("fulfilment status") {
        /// No fulfilment progress recorded (order level only).
        Unspecified => "unspecified",
        /// Fulfilment recorded, not yet handed to a carrier.
        Pending => "pending",
        /// Handed to a carrier.
        Shipped => "shipped",
        /// Received by the customer.
        Delivered => "delivered",
    }
}

impl FulfilmentStatus {
    /// Position along the linear shipment path.
    const fn rank(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Pending => 1,
            Self::Shipped => 2,
            Self::Delivered => 3,
        }
    }

    /// Return `true` when a fulfilment may move from `self` to `next`.
    ///
    /// Moves advance one step at a time along
    /// `pending -> shipped -> delivered`; staying in place is allowed.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::FulfilmentStatus;
    ///
    /// assert!(FulfilmentStatus::Pending.can_transition_to(FulfilmentStatus::Shipped));
    /// assert!(!FulfilmentStatus::Pending.can_transition_to(FulfilmentStatus::Delivered));
    /// assert!(!FulfilmentStatus::Delivered.can_transition_to(FulfilmentStatus::Shipped));
    /// ```
    pub const fn can_transition_to(self, next: Self) -> bool {
        if matches!(next, Self::Unspecified) {
            return false;
        }
        let (from, to) = (self.rank(), next.rank());
        to == from || to == from + 1
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for status parsing and transitions.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn every_status_round_trips_through_its_string_form() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(*status));
        }
        for status in CartStatus::ALL {
            assert_eq!(status.as_str().parse::<CartStatus>(), Ok(*status));
        }
    }

    #[rstest]
    fn unknown_status_lists_expected_values() {
        let error = "shipped".parse::<OrderStatus>().expect_err("unknown");
        assert_eq!(error.kind, "order status");
        assert!(error.expected.contains("confirmed"));
    }

    #[rstest]
    #[case(FulfilmentStatus::Pending, FulfilmentStatus::Shipped, true)]
    #[case(FulfilmentStatus::Shipped, FulfilmentStatus::Delivered, true)]
    #[case(FulfilmentStatus::Pending, FulfilmentStatus::Delivered, false)]
    #[case(FulfilmentStatus::Shipped, FulfilmentStatus::Shipped, true)]
    #[case(FulfilmentStatus::Shipped, FulfilmentStatus::Pending, false)]
    #[case(FulfilmentStatus::Delivered, FulfilmentStatus::Shipped, false)]
    #[case(FulfilmentStatus::Pending, FulfilmentStatus::Unspecified, false)]
    fn fulfilment_transitions_take_single_forward_steps(
        #[case] from: FulfilmentStatus,
        #[case] to: FulfilmentStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
