//! Shopping cart aggregate.
//!
//! A cart owns an ordered list of lines with at most one line per variant.
//! Lines can only change while the cart is [`CartStatus::Active`]; a cart
//! becomes [`CartStatus::Converted`] exactly once, when an order is created
//! from it, and never reverts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CartId, CartLineId, CartStatus, ContactId, ProfileId, Quantity, QuantityError, ShopId,
    VariantId,
};

/// Errors raised by cart state transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The cart is no longer active.
    #[error("cart {cart_id} is {status}, not active")]
    NotActive {
        /// Cart identifier.
        cart_id: CartId,
        /// Current status.
        status: CartStatus,
    },
    /// The line does not belong to the cart.
    #[error("cart line {line_id} not found in cart {cart_id}")]
    LineNotFound {
        /// Cart identifier.
        cart_id: CartId,
        /// Missing line.
        line_id: CartLineId,
    },
    /// Merging quantities overflowed.
    #[error("cart line quantity for variant {variant_id} overflowed")]
    QuantityOverflow {
        /// Variant whose quantity overflowed.
        variant_id: VariantId,
    },
}

/// One variant and its requested quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Line identifier.
    pub id: CartLineId,
    /// Requested variant.
    pub variant_id: VariantId,
    /// Requested quantity.
    pub quantity: Quantity,
}

/// Owner references attached to a cart or order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRefs {
    /// Customer profile.
    pub profile_id: Option<ProfileId>,
    /// Contact record.
    pub contact_id: Option<ContactId>,
}

/// Shopping cart with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    shop_id: ShopId,
    status: CartStatus,
    customer: CustomerRefs,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
}

impl Cart {
    /// Open a new, empty, active cart.
    pub fn open(id: CartId, shop_id: ShopId, customer: CustomerRefs, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            shop_id,
            status: CartStatus::Active,
            customer,
            lines: Vec::new(),
            created_at,
        }
    }

    /// Rehydrate a cart from storage.
    pub fn from_parts(
        id: CartId,
        shop_id: ShopId,
        status: CartStatus,
        customer: CustomerRefs,
        lines: Vec<CartLine>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            shop_id,
            status,
            customer,
            lines,
            created_at,
        }
    }

    /// Cart identifier.
    pub fn id(&self) -> CartId {
        self.id
    }

    /// Owning shop.
    pub fn shop_id(&self) -> ShopId {
        self.shop_id
    }

    /// Current status.
    pub fn status(&self) -> CartStatus {
        self.status
    }

    /// Owner references.
    pub fn customer(&self) -> CustomerRefs {
        self.customer
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Fail unless the cart accepts mutations.
    pub fn ensure_active(&self) -> Result<(), CartError> {
        match self.status {
            CartStatus::Active => Ok(()),
            status @ (CartStatus::Converted | CartStatus::Abandoned) => Err(CartError::NotActive {
                cart_id: self.id,
                status,
            }),
        }
    }

    /// Add `quantity` of a variant, merging into an existing line for the
    /// same variant. `new_line_id` is only used when no such line exists.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use commerce::domain::{Cart, CartId, CartLineId, CustomerRefs, Quantity, ShopId, VariantId};
    ///
    /// let mut cart = Cart::open(CartId::random(), ShopId::random(), CustomerRefs::default(), Utc::now());
    /// let variant = VariantId::random();
    /// cart.merge_line(CartLineId::random(), variant, Quantity::new(2).expect("positive")).expect("active");
    /// cart.merge_line(CartLineId::random(), variant, Quantity::new(3).expect("positive")).expect("active");
    /// assert_eq!(cart.lines().len(), 1);
    /// assert_eq!(cart.lines()[0].quantity.get(), 5);
    /// ```
    pub fn merge_line(
        &mut self,
        new_line_id: CartLineId,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<CartLine, CartError> {
        self.ensure_active()?;
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.variant_id == variant_id)
        {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .map_err(|_: QuantityError| CartError::QuantityOverflow { variant_id })?;
            return Ok(*line);
        }
        let line = CartLine {
            id: new_line_id,
            variant_id,
            quantity,
        };
        self.lines.push(line);
        Ok(line)
    }

    /// Remove a line from an active cart.
    pub fn remove_line(&mut self, line_id: CartLineId) -> Result<CartLine, CartError> {
        self.ensure_active()?;
        let position = self
            .lines
            .iter()
            .position(|line| line.id == line_id)
            .ok_or(CartError::LineNotFound {
                cart_id: self.id,
                line_id,
            })?;
        Ok(self.lines.remove(position))
    }

    /// Transition an active cart to converted.
    pub fn mark_converted(&mut self) -> Result<(), CartError> {
        self.ensure_active()?;
        self.status = CartStatus::Converted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for cart line bookkeeping.

    use super::*;
    use rstest::{fixture, rstest};

    fn qty(value: i64) -> Quantity {
        Quantity::new(value).expect("positive quantity")
    }

    #[fixture]
    fn cart() -> Cart {
        Cart::open(
            CartId::random(),
            ShopId::random(),
            CustomerRefs::default(),
            Utc::now(),
        )
    }

    #[rstest]
    fn merging_same_variant_sums_quantities(mut cart: Cart) {
        let variant = VariantId::random();
        let first = cart
            .merge_line(CartLineId::random(), variant, qty(2))
            .expect("active cart");
        let merged = cart
            .merge_line(CartLineId::random(), variant, qty(3))
            .expect("active cart");

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, qty(5));
        assert_eq!(cart.lines().len(), 1);
    }

    #[rstest]
    fn distinct_variants_keep_insertion_order(mut cart: Cart) {
        let (a, b) = (VariantId::random(), VariantId::random());
        cart.merge_line(CartLineId::random(), a, qty(1))
            .expect("active cart");
        cart.merge_line(CartLineId::random(), b, qty(1))
            .expect("active cart");

        let variants: Vec<_> = cart.lines().iter().map(|line| line.variant_id).collect();
        assert_eq!(variants, vec![a, b]);
    }

    #[rstest]
    fn merge_reports_overflow(mut cart: Cart) {
        let variant = VariantId::random();
        cart.merge_line(CartLineId::random(), variant, qty(i64::MAX))
            .expect("active cart");
        let error = cart
            .merge_line(CartLineId::random(), variant, qty(1))
            .expect_err("overflow");
        assert_eq!(error, CartError::QuantityOverflow { variant_id: variant });
    }

    #[rstest]
    fn converted_cart_rejects_mutation(mut cart: Cart) {
        cart.mark_converted().expect("first conversion");
        let error = cart
            .merge_line(CartLineId::random(), VariantId::random(), qty(1))
            .expect_err("not active");
        assert!(matches!(error, CartError::NotActive { status: CartStatus::Converted, .. }));
        assert!(cart.mark_converted().is_err());
    }

    #[rstest]
    fn removing_unknown_line_fails(mut cart: Cart) {
        let line_id = CartLineId::random();
        assert!(matches!(
            cart.remove_line(line_id),
            Err(CartError::LineNotFound { .. })
        ));
    }
}
