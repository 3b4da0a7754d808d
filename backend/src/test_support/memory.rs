//! In-memory adapter implementing every driven port.
//!
//! All state sits behind one mutex, so each port call observes and mutates
//! a consistent snapshot. Multi-row operations (placing an order,
//! cancelling it, recording a fulfilment) stage their changes and only
//! publish them once every check has passed, mirroring the transactional
//! behaviour of the Diesel adapters.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::ports::{
    CartRepository, CartRepositoryError, CatalogRepository, CatalogRepositoryError,
    FulfilmentRepository, FulfilmentRepositoryError, OrderPage, OrderRepository,
    OrderRepositoryError, VariantStockError, VariantStockGateway,
};
use crate::domain::{
    Cart, CartError, CartId, CartLine, CartLineId, FulfilledQuantities, Fulfilment, FulfilmentId,
    FulfilmentStatus, IdempotencyKey, Order, OrderId, OrderStatus, OrderStatuses, Product,
    ProductId, Quantity, Shop, ShopId, Variant, VariantId, check_fulfilment,
};

#[derive(Default)]
struct State {
    shops: BTreeMap<ShopId, Shop>,
    products: BTreeMap<ProductId, Product>,
    variants: BTreeMap<VariantId, Variant>,
    carts: BTreeMap<CartId, Cart>,
    /// Orders in placement order.
    orders: Vec<Order>,
    /// Fulfilments in creation order.
    fulfilments: Vec<Fulfilment>,
}

impl State {
    fn order_index(&self, id: &OrderId) -> Option<usize> {
        self.orders.iter().position(|order| order.id() == *id)
    }

    fn fulfilled_quantities(&self, order_id: &OrderId) -> FulfilledQuantities {
        let mut fulfilled = FulfilledQuantities::new();
        for fulfilment in self
            .fulfilments
            .iter()
            .filter(|fulfilment| fulfilment.order_id() == *order_id)
        {
            for line in fulfilment.lines() {
                *fulfilled.entry(line.order_line_id).or_insert(0) += line.quantity.get();
            }
        }
        fulfilled
    }
}

/// Units per variant across `lines`.
fn demand(lines: impl Iterator<Item = (VariantId, Quantity)>) -> BTreeMap<VariantId, i64> {
    let mut totals = BTreeMap::new();
    for (variant_id, quantity) in lines {
        *totals.entry(variant_id).or_insert(0) += quantity.get();
    }
    totals
}

/// Thread-safe store backing integration tests and local experiments.
#[derive(Default)]
pub struct InMemoryCommerceStore {
    state: Mutex<State>,
}

impl InMemoryCommerceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock of a variant, if it exists.
    pub fn stock_of(&self, id: &VariantId) -> Option<i64> {
        self.lock().variants.get(id).map(Variant::stock_quantity)
    }

    /// Number of persisted orders.
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("commerce store mutex"),
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCommerceStore {
    async fn insert_shop(&self, shop: &Shop) -> Result<(), CatalogRepositoryError> {
        let mut state = self.lock();
        if state.shops.values().any(|existing| existing.slug() == shop.slug()) {
            return Err(CatalogRepositoryError::duplicate_slug(shop.slug().to_string()));
        }
        state.shops.insert(shop.id(), shop.clone());
        Ok(())
    }

    async fn find_shop(&self, id: &ShopId) -> Result<Option<Shop>, CatalogRepositoryError> {
        Ok(self.lock().shops.get(id).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), CatalogRepositoryError> {
        self.lock().products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn find_product(
        &self,
        id: &ProductId,
    ) -> Result<Option<Product>, CatalogRepositoryError> {
        Ok(self.lock().products.get(id).cloned())
    }

    async fn insert_variant(&self, variant: &Variant) -> Result<(), CatalogRepositoryError> {
        let mut state = self.lock();
        if state.variants.values().any(|existing| existing.sku() == variant.sku()) {
            return Err(CatalogRepositoryError::duplicate_sku(variant.sku()));
        }
        state.variants.insert(variant.id(), variant.clone());
        Ok(())
    }
}

#[async_trait]
impl VariantStockGateway for InMemoryCommerceStore {
    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, VariantStockError> {
        Ok(self.lock().variants.get(id).cloned())
    }

    async fn decrement_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        let mut state = self.lock();
        let variant = state
            .variants
            .get_mut(id)
            .ok_or_else(|| VariantStockError::variant_not_found(*id))?;
        let remaining = variant.stock_quantity() - quantity.get();
        if remaining < 0 {
            return Err(VariantStockError::insufficient_stock(*id));
        }
        *variant = variant.clone().with_stock_quantity(remaining);
        Ok(remaining)
    }

    async fn increment_stock(
        &self,
        id: &VariantId,
        quantity: Quantity,
    ) -> Result<i64, VariantStockError> {
        let mut state = self.lock();
        let variant = state
            .variants
            .get_mut(id)
            .ok_or_else(|| VariantStockError::variant_not_found(*id))?;
        let stock = variant
            .stock_quantity()
            .checked_add(quantity.get())
            .ok_or_else(|| VariantStockError::query("stock quantity overflow"))?;
        *variant = variant.clone().with_stock_quantity(stock);
        Ok(stock)
    }
}

#[async_trait]
impl CartRepository for InMemoryCommerceStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<(), CartRepositoryError> {
        self.lock().carts.insert(cart.id(), cart.clone());
        Ok(())
    }

    async fn find_cart(&self, id: &CartId) -> Result<Option<Cart>, CartRepositoryError> {
        Ok(self.lock().carts.get(id).cloned())
    }

    async fn merge_line(
        &self,
        cart_id: &CartId,
        line: &CartLine,
    ) -> Result<CartLine, CartRepositoryError> {
        let mut state = self.lock();
        let cart = state
            .carts
            .get_mut(cart_id)
            .ok_or_else(|| CartRepositoryError::cart_not_found(*cart_id))?;
        cart.merge_line(line.id, line.variant_id, line.quantity)
            .map_err(|error| match error {
                CartError::NotActive { .. } => CartRepositoryError::not_active(*cart_id),
                other => CartRepositoryError::query(other.to_string()),
            })
    }

    async fn remove_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> Result<(), CartRepositoryError> {
        let mut state = self.lock();
        let cart = state
            .carts
            .get_mut(cart_id)
            .ok_or_else(|| CartRepositoryError::cart_not_found(*cart_id))?;
        cart.remove_line(*line_id)
            .map(|_| ())
            .map_err(|error| match error {
                CartError::NotActive { .. } => CartRepositoryError::not_active(*cart_id),
                CartError::LineNotFound { .. } => CartRepositoryError::line_not_found(*line_id),
                other => CartRepositoryError::query(other.to_string()),
            })
    }
}

#[async_trait]
impl OrderRepository for InMemoryCommerceStore {
    async fn place_order(
        &self,
        order: &Order,
        source_cart: Option<CartId>,
    ) -> Result<(), OrderRepositoryError> {
        let mut state = self.lock();
        if state
            .orders
            .iter()
            .any(|existing| existing.idempotency_key() == order.idempotency_key())
        {
            return Err(OrderRepositoryError::duplicate_idempotency_key(
                order.idempotency_key().to_string(),
            ));
        }

        let mut staged: BTreeMap<VariantId, Variant> = BTreeMap::new();
        for line in order.lines() {
            let current = match staged.get(&line.variant_id) {
                Some(variant) => variant.clone(),
                None => state
                    .variants
                    .get(&line.variant_id)
                    .cloned()
                    .ok_or_else(|| OrderRepositoryError::variant_not_found(line.variant_id))?,
            };
            let remaining = current.stock_quantity() - line.quantity.get();
            if remaining < 0 {
                return Err(OrderRepositoryError::insufficient_stock(line.variant_id));
            }
            staged.insert(line.variant_id, current.with_stock_quantity(remaining));
        }

        let converted = match source_cart {
            Some(cart_id) => {
                let mut cart = state
                    .carts
                    .get(&cart_id)
                    .cloned()
                    .ok_or_else(|| OrderRepositoryError::cart_not_active(cart_id))?;
                cart.mark_converted()
                    .map_err(|_| OrderRepositoryError::cart_not_active(cart_id))?;
                let cart_demand =
                    demand(cart.lines().iter().map(|line| (line.variant_id, line.quantity)));
                let order_demand =
                    demand(order.lines().iter().map(|line| (line.variant_id, line.quantity)));
                if cart_demand != order_demand {
                    return Err(OrderRepositoryError::cart_changed(cart_id));
                }
                Some(cart)
            }
            None => None,
        };

        state.variants.extend(staged);
        if let Some(cart) = converted {
            state.carts.insert(cart.id(), cart);
        }
        state.orders.push(order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderRepositoryError> {
        let state = self.lock();
        Ok(state.order_index(id).map(|index| state.orders[index].clone()))
    }

    async fn find_by_idempotency_key(
        &self,
        key: &IdempotencyKey,
    ) -> Result<Option<Order>, OrderRepositoryError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|order| order.idempotency_key() == key)
            .cloned())
    }

    async fn list_by_shop(
        &self,
        shop_id: &ShopId,
        page: OrderPage,
    ) -> Result<Vec<Order>, OrderRepositoryError> {
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(0);
        Ok(self
            .lock()
            .orders
            .iter()
            .rev()
            .filter(|order| order.shop_id() == *shop_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_statuses(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        statuses: OrderStatuses,
    ) -> Result<bool, OrderRepositoryError> {
        let mut state = self.lock();
        let index = state
            .order_index(id)
            .ok_or_else(|| OrderRepositoryError::not_found(*id))?;
        if state.orders[index].status() != expected {
            return Ok(false);
        }
        let order = state.orders[index].clone().with_statuses(statuses);
        state.orders[index] = order;
        Ok(true)
    }

    async fn cancel_order(&self, id: &OrderId) -> Result<Order, OrderRepositoryError> {
        let mut state = self.lock();
        let index = state
            .order_index(id)
            .ok_or_else(|| OrderRepositoryError::not_found(*id))?;
        let order = state.orders[index].clone();
        if order.status() != OrderStatus::Confirmed {
            return Err(OrderRepositoryError::not_cancellable(
                *id,
                format!("order is {}", order.status()),
            ));
        }
        if state
            .fulfilments
            .iter()
            .any(|fulfilment| fulfilment.order_id() == *id)
        {
            return Err(OrderRepositoryError::not_cancellable(
                *id,
                "order has fulfilments",
            ));
        }

        for line in order.lines() {
            if let Some(variant) = state.variants.get_mut(&line.variant_id) {
                let restocked = variant.stock_quantity().saturating_add(line.quantity.get());
                *variant = variant.clone().with_stock_quantity(restocked);
            }
        }
        let statuses = OrderStatuses {
            status: OrderStatus::Cancelled,
            ..order.statuses()
        };
        let cancelled = order.with_statuses(statuses);
        state.orders[index] = cancelled.clone();
        Ok(cancelled)
    }
}

#[async_trait]
impl FulfilmentRepository for InMemoryCommerceStore {
    async fn record_fulfilment(
        &self,
        fulfilment: &Fulfilment,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        let mut state = self.lock();
        let order_id = fulfilment.order_id();
        let order = state
            .order_index(&order_id)
            .map(|index| state.orders[index].clone())
            .ok_or_else(|| FulfilmentRepositoryError::order_not_found(order_id))?;

        let requested: Vec<_> = fulfilment
            .lines()
            .iter()
            .map(|line| (line.order_line_id, line.quantity))
            .collect();
        check_fulfilment(&order, &requested, &state.fulfilled_quantities(&order_id))
            .map_err(FulfilmentRepositoryError::rejected)?;

        state.fulfilments.push(fulfilment.clone());
        Ok(state.fulfilled_quantities(&order_id))
    }

    async fn fulfilled_quantities(
        &self,
        order_id: &OrderId,
    ) -> Result<FulfilledQuantities, FulfilmentRepositoryError> {
        Ok(self.lock().fulfilled_quantities(order_id))
    }

    async fn find_by_id(
        &self,
        id: &FulfilmentId,
    ) -> Result<Option<Fulfilment>, FulfilmentRepositoryError> {
        Ok(self
            .lock()
            .fulfilments
            .iter()
            .find(|fulfilment| fulfilment.id() == *id)
            .cloned())
    }

    async fn list_by_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<Fulfilment>, FulfilmentRepositoryError> {
        Ok(self
            .lock()
            .fulfilments
            .iter()
            .filter(|fulfilment| fulfilment.order_id() == *order_id)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        fulfilment: &Fulfilment,
        expected: FulfilmentStatus,
    ) -> Result<(), FulfilmentRepositoryError> {
        let mut state = self.lock();
        let slot = state
            .fulfilments
            .iter_mut()
            .find(|existing| existing.id() == fulfilment.id())
            .ok_or_else(|| FulfilmentRepositoryError::not_found(fulfilment.id()))?;
        if slot.status() != expected {
            return Err(FulfilmentRepositoryError::status_changed(
                fulfilment.id(),
                expected,
            ));
        }
        *slot = fulfilment.clone();
        Ok(())
    }
}
