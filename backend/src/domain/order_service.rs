//! Order creation engine.
//!
//! Both entry points (explicit lines and cart conversion) funnel into one
//! procedure: replay by idempotency key, validate the shop, then validate
//! and price every line in caller order before anything is written. The
//! commit itself is delegated to [`OrderRepository::place_order`], which
//! writes the header, the lines and every conditional stock decrement as
//! one atomic unit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::cart_service::map_cart_state_error;
use super::service_errors::{
    map_cart_error, map_catalog_error, map_order_error, map_stock_error, variant_not_found,
};
use crate::domain::ports::{
    CartRepository, CatalogRepository, CreateOrderFromCartRequest, CreateOrderRequest,
    CreateOrderResponse, ListOrdersRequest, OrderCommand, OrderLineRequest, OrderPage,
    OrderQuery, OrderRepository, OrderRepositoryError, VariantStockGateway,
};
use crate::domain::{
    AddressId, CartId, CustomerRefs, Error, IdempotencyKey, Order, OrderDraft, OrderId, OrderLineId,
    OrderNumber, OrderPricing, PricingError, Quantity, ShopId, Variant, VariantId,
};

/// Page size policy for [`OrderQuery::list_orders`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderListingConfig {
    default_page_size: i64,
    max_page_size: i64,
}

impl OrderListingConfig {
    /// Page size used when a caller asks for zero rows.
    pub const DEFAULT_PAGE_SIZE: i64 = 50;
    /// Largest page a caller may request.
    pub const MAX_PAGE_SIZE: i64 = 200;

    /// Build a policy; sizes below one are raised to one and the default is
    /// capped at the maximum.
    pub fn new(default_page_size: i64, max_page_size: i64) -> Self {
        let max_page_size = max_page_size.max(1);
        Self {
            default_page_size: default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    /// Page size used when a caller asks for zero rows.
    pub fn default_page_size(&self) -> i64 {
        self.default_page_size
    }

    /// Largest page a caller may request.
    pub fn max_page_size(&self) -> i64 {
        self.max_page_size
    }

    /// Normalise a caller's window.
    ///
    /// # Examples
    /// ```
    /// use commerce::domain::OrderListingConfig;
    ///
    /// let config = OrderListingConfig::default();
    /// assert_eq!(config.page(0, 0).expect("valid").limit, 50);
    /// assert_eq!(config.page(5_000, 10).expect("valid").limit, 200);
    /// assert!(config.page(-1, 0).is_err());
    /// ```
    pub fn page(&self, limit: i64, offset: i64) -> Result<OrderPage, Error> {
        if limit < 0 || offset < 0 {
            return Err(Error::invalid_request("limit and offset must not be negative"));
        }
        let limit = match limit {
            0 => self.default_page_size,
            requested => requested.min(self.max_page_size),
        };
        Ok(OrderPage { limit, offset })
    }
}

impl Default for OrderListingConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE, Self::MAX_PAGE_SIZE)
    }
}

/// Order service implementing the order driving ports.
#[derive(Clone)]
pub struct OrderService<O, V, C, K> {
    order_repo: Arc<O>,
    stock_gateway: Arc<V>,
    cart_repo: Arc<C>,
    catalog_repo: Arc<K>,
    clock: Arc<dyn Clock>,
    listing: OrderListingConfig,
}

impl<O, V, C, K> OrderService<O, V, C, K> {
    /// Create a new service with the given adapters and default listing
    /// policy.
    pub fn new(
        order_repo: Arc<O>,
        stock_gateway: Arc<V>,
        cart_repo: Arc<C>,
        catalog_repo: Arc<K>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            order_repo,
            stock_gateway,
            cart_repo,
            catalog_repo,
            clock,
            listing: OrderListingConfig::default(),
        }
    }

    /// Replace the listing policy.
    #[must_use]
    pub fn with_listing_config(mut self, listing: OrderListingConfig) -> Self {
        self.listing = listing;
        self
    }
}

/// A validated order-creation request.
struct PlacementRequest {
    shop_id: ShopId,
    customer: CustomerRefs,
    address_id: Option<AddressId>,
    idempotency_key: Option<IdempotencyKey>,
    lines: Vec<OrderLineRequest>,
    source_cart: Option<CartId>,
}

fn parse_idempotency_key(raw: Option<&str>) -> Result<Option<IdempotencyKey>, Error> {
    match raw.map(str::trim).filter(|key| !key.is_empty()) {
        None => Ok(None),
        Some(key) => IdempotencyKey::new(key)
            .map(Some)
            .map_err(|err| Error::invalid_request(err.to_string())),
    }
}

fn map_pricing_error(error: PricingError) -> Error {
    let message = error.to_string();
    match error {
        PricingError::EmptyOrder => Error::invalid_request(message),
        PricingError::CurrencyMismatch {
            variant_id,
            expected,
            actual,
        } => Error::invalid_request(message).with_details(json!({
            "variantId": variant_id,
            "expectedCurrency": expected,
            "actualCurrency": actual,
        })),
        PricingError::Overflow { variant_id } => {
            Error::invalid_request(message).with_details(json!({ "variantId": variant_id }))
        }
    }
}

impl<O, V, C, K> OrderService<O, V, C, K>
where
    O: OrderRepository,
    V: VariantStockGateway,
    C: CartRepository,
    K: CatalogRepository,
{
    async fn find_replay(&self, key: &IdempotencyKey) -> Result<Option<Order>, Error> {
        self.order_repo
            .find_by_idempotency_key(key)
            .await
            .map_err(map_order_error)
    }

    async fn require_shop(&self, shop_id: &ShopId) -> Result<(), Error> {
        self.catalog_repo
            .find_shop(shop_id)
            .await
            .map_err(map_catalog_error)?
            .map(|_| ())
            .ok_or_else(|| Error::not_found(format!("shop {shop_id} not found")))
    }

    async fn resolve_variant(
        &self,
        cache: &mut BTreeMap<VariantId, Variant>,
        variant_id: VariantId,
    ) -> Result<Variant, Error> {
        if let Some(variant) = cache.get(&variant_id) {
            return Ok(variant.clone());
        }
        let variant = self
            .stock_gateway
            .find_variant(&variant_id)
            .await
            .map_err(map_stock_error)?
            .ok_or_else(|| variant_not_found(variant_id))?;
        cache.insert(variant_id, variant.clone());
        Ok(variant)
    }

    /// Validate and price every line in caller order.
    async fn price_lines(
        &self,
        shop_id: ShopId,
        lines: &[OrderLineRequest],
    ) -> Result<OrderPricing, Error> {
        let mut pricing = OrderPricing::new();
        let mut variants = BTreeMap::new();
        let mut requested: BTreeMap<VariantId, i64> = BTreeMap::new();

        for line in lines {
            let quantity = Quantity::new(line.quantity).map_err(|_| {
                Error::invalid_request(format!(
                    "quantity must be positive for variant {}",
                    line.variant_id
                ))
                .with_details(json!({ "variantId": line.variant_id }))
            })?;
            let variant = self.resolve_variant(&mut variants, line.variant_id).await?;
            if variant.shop_id() != shop_id {
                return Err(Error::invalid_request(format!(
                    "variant {} does not belong to shop {shop_id}",
                    variant.id()
                )));
            }

            // Advisory only; the conditional decrement at commit is authoritative.
            let total = requested.entry(variant.id()).or_insert(0);
            *total = total.saturating_add(quantity.get());
            if *total > variant.stock_quantity() {
                return Err(Error::failed_precondition(format!(
                    "insufficient stock for variant {}: requested {}, available {}",
                    variant.id(),
                    *total,
                    variant.stock_quantity()
                ))
                .with_details(json!({
                    "variantId": variant.id(),
                    "requested": *total,
                    "available": variant.stock_quantity(),
                })));
            }

            pricing
                .add_line(OrderLineId::random(), &variant, quantity)
                .map_err(map_pricing_error)?;
        }
        Ok(pricing)
    }

    async fn resolve_lost_race(
        &self,
        key: Option<&IdempotencyKey>,
        error: OrderRepositoryError,
    ) -> Result<Order, Error> {
        let Some(key) = key else {
            return Err(map_order_error(error));
        };
        self.find_replay(key).await?.ok_or_else(|| {
            Error::internal("idempotent order disappeared during race resolution")
        })
    }

    async fn place(&self, request: PlacementRequest) -> Result<CreateOrderResponse, Error> {
        if let Some(key) = request.idempotency_key.as_ref() {
            if let Some(order) = self.find_replay(key).await? {
                info!(order_id = %order.id(), idempotency_key = %key, "order replayed");
                return Ok(CreateOrderResponse {
                    order,
                    replayed: true,
                });
            }
        }

        self.require_shop(&request.shop_id).await?;
        if request.lines.is_empty() {
            return Err(Error::invalid_request("order must have at least one line"));
        }
        let priced = self
            .price_lines(request.shop_id, &request.lines)
            .await?
            .finish()
            .map_err(map_pricing_error)?;

        let placed_at = self.clock.utc();
        let order = Order::place(OrderDraft {
            id: OrderId::random(),
            shop_id: request.shop_id,
            order_number: OrderNumber::generate(placed_at, Uuid::new_v4()),
            idempotency_key: request.idempotency_key.clone(),
            customer: request.customer,
            address_id: request.address_id,
            priced,
            placed_at,
        });

        match self.order_repo.place_order(&order, request.source_cart).await {
            Ok(()) => {
                info!(
                    order_id = %order.id(),
                    order_number = %order.order_number(),
                    lines = order.lines().len(),
                    total = %order.total(),
                    "order placed"
                );
                Ok(CreateOrderResponse {
                    order,
                    replayed: false,
                })
            }
            Err(error @ OrderRepositoryError::DuplicateIdempotencyKey { .. }) => {
                warn!(order_id = %order.id(), "idempotency key race lost; returning winner");
                let order = self
                    .resolve_lost_race(request.idempotency_key.as_ref(), error)
                    .await?;
                Ok(CreateOrderResponse {
                    order,
                    replayed: true,
                })
            }
            Err(error) => Err(map_order_error(error)),
        }
    }
}

#[async_trait]
impl<O, V, C, K> OrderCommand for OrderService<O, V, C, K>
where
    O: OrderRepository,
    V: VariantStockGateway,
    C: CartRepository,
    K: CatalogRepository,
{
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, Error> {
        let idempotency_key = parse_idempotency_key(request.idempotency_key.as_deref())?;
        self.place(PlacementRequest {
            shop_id: request.shop_id,
            customer: request.customer,
            address_id: request.address_id,
            idempotency_key,
            lines: request.lines,
            source_cart: None,
        })
        .await
    }

    async fn create_order_from_cart(
        &self,
        request: CreateOrderFromCartRequest,
    ) -> Result<CreateOrderResponse, Error> {
        let cart_id = request.cart_id;
        let cart = self
            .cart_repo
            .find_cart(&cart_id)
            .await
            .map_err(map_cart_error)?
            .ok_or_else(|| Error::not_found(format!("cart {cart_id} not found")))?;
        cart.ensure_active().map_err(map_cart_state_error)?;
        if cart.lines().is_empty() {
            return Err(Error::invalid_request(format!("cart {cart_id} has no items")));
        }

        let owner = cart.customer();
        let customer = CustomerRefs {
            profile_id: request.customer.profile_id.or(owner.profile_id),
            contact_id: request.customer.contact_id.or(owner.contact_id),
        };
        let lines = cart
            .lines()
            .iter()
            .map(|line| OrderLineRequest {
                variant_id: line.variant_id,
                quantity: line.quantity.get(),
            })
            .collect();

        let response = self
            .place(PlacementRequest {
                shop_id: cart.shop_id(),
                customer,
                address_id: request.address_id,
                idempotency_key: None,
                lines,
                source_cart: Some(cart_id),
            })
            .await?;
        info!(cart_id = %cart_id, order_id = %response.order.id(), "cart converted");
        Ok(response)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<Order, Error> {
        let order = self
            .order_repo
            .cancel_order(id)
            .await
            .map_err(map_order_error)?;
        info!(order_id = %order.id(), lines = order.lines().len(), "order cancelled and restocked");
        Ok(order)
    }
}

#[async_trait]
impl<O, V, C, K> OrderQuery for OrderService<O, V, C, K>
where
    O: OrderRepository,
    V: VariantStockGateway,
    C: CartRepository,
    K: CatalogRepository,
{
    async fn get_order(&self, id: &OrderId) -> Result<Order, Error> {
        self.order_repo
            .find_by_id(id)
            .await
            .map_err(map_order_error)?
            .ok_or_else(|| Error::not_found(format!("order {id} not found")))
    }

    async fn list_orders(&self, request: ListOrdersRequest) -> Result<Vec<Order>, Error> {
        let page = self.listing.page(request.limit, request.offset)?;
        self.order_repo
            .list_by_shop(&request.shop_id, page)
            .await
            .map_err(map_order_error)
    }
}

#[cfg(test)]
#[path = "order_service_tests.rs"]
mod tests;
