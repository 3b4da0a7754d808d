//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations. Conversions back into the
//! domain report malformed rows as plain messages; each adapter wraps them
//! in its own query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    AddressId, Cart, CartId, CartLine, CartLineId, ContactId, CustomerRefs, Fulfilment,
    FulfilmentId, FulfilmentLine, FulfilmentLineId, IdempotencyKey, Money, Order, OrderId,
    OrderLine, OrderLineId, OrderNumber, OrderStatuses, ProductId, ProfileId, Quantity, Shop,
    ShopId, ShopSlug, StoredFulfilment, StoredOrder, Variant, VariantId,
};

use super::schema::{
    cart_lines, carts, fulfilment_lines, fulfilments, order_lines, orders, product_variants,
    products, shops,
};

pub(crate) fn money_from_columns(
    column: &str,
    currency: &str,
    units: i64,
    nanos: i32,
) -> Result<Money, String> {
    Money::new(currency, units, nanos).map_err(|err| format!("invalid {column}: {err}"))
}

fn quantity_from_column(column: &str, value: i64) -> Result<Quantity, String> {
    Quantity::new(value).map_err(|err| format!("invalid {column}: {err}"))
}

fn parse_status<T>(column: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|err: T::Err| format!("invalid {column}: {err}"))
}

fn customer_refs(profile_id: Option<Uuid>, contact_id: Option<Uuid>) -> CustomerRefs {
    CustomerRefs {
        profile_id: profile_id.map(ProfileId::from_uuid),
        contact_id: contact_id.map(ContactId::from_uuid),
    }
}

// ---------------------------------------------------------------------------
// Catalog models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = shops)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShopRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ShopRow> for Shop {
    type Error = String;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let slug = ShopSlug::new(row.slug).map_err(|err| format!("invalid shop slug: {err}"))?;
        Ok(Shop::from_parts(
            ShopId::from_uuid(row.id),
            row.name,
            slug,
            row.created_at,
        ))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shops)]
pub(crate) struct NewShopRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub slug: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Shop> for NewShopRow<'a> {
    fn from(shop: &'a Shop) -> Self {
        Self {
            id: *shop.id().as_uuid(),
            name: shop.name(),
            slug: shop.slug().as_ref(),
            created_at: shop.created_at(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = product_variants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub sku: String,
    pub name: String,
    pub price_currency: String,
    pub price_units: i64,
    pub price_nanos: i32,
    pub stock_quantity: i64,
}

impl TryFrom<VariantRow> for Variant {
    type Error = String;

    fn try_from(row: VariantRow) -> Result<Self, Self::Error> {
        let unit_price = money_from_columns(
            "variant price",
            &row.price_currency,
            row.price_units,
            row.price_nanos,
        )?;
        Ok(Variant::from_parts(
            VariantId::from_uuid(row.id),
            ProductId::from_uuid(row.product_id),
            ShopId::from_uuid(row.shop_id),
            row.sku,
            row.name,
            unit_price,
            row.stock_quantity,
        ))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = product_variants)]
pub(crate) struct NewVariantRow<'a> {
    pub id: Uuid,
    pub product_id: Uuid,
    pub shop_id: Uuid,
    pub sku: &'a str,
    pub name: &'a str,
    pub price_currency: String,
    pub price_units: i64,
    pub price_nanos: i32,
    pub stock_quantity: i64,
}

impl<'a> From<&'a Variant> for NewVariantRow<'a> {
    fn from(variant: &'a Variant) -> Self {
        let price = variant.unit_price();
        Self {
            id: *variant.id().as_uuid(),
            product_id: *variant.product_id().as_uuid(),
            shop_id: *variant.shop_id().as_uuid(),
            sku: variant.sku(),
            name: variant.name(),
            price_currency: price.currency().to_string(),
            price_units: price.units(),
            price_nanos: price.nanos(),
            stock_quantity: variant.stock_quantity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cart models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CartRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub status: String,
    pub profile_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carts)]
pub(crate) struct NewCartRow<'a> {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub status: &'a str,
    pub profile_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&Cart> for NewCartRow<'static> {
    fn from(cart: &Cart) -> Self {
        let customer = cart.customer();
        Self {
            id: *cart.id().as_uuid(),
            shop_id: *cart.shop_id().as_uuid(),
            status: cart.status().as_str(),
            profile_id: customer.profile_id.map(|id| *id.as_uuid()),
            contact_id: customer.contact_id.map(|id| *id.as_uuid()),
            created_at: cart.created_at(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = cart_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CartLineRow {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i64,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = String;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(CartLine {
            id: CartLineId::from_uuid(row.id),
            variant_id: VariantId::from_uuid(row.variant_id),
            quantity: quantity_from_column("cart line quantity", row.quantity)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cart_lines)]
pub(crate) struct NewCartLineRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub variant_id: Uuid,
    pub quantity: i64,
}

/// Assemble a cart from its header and lines (already in `seq` order).
pub(crate) fn cart_from_rows(row: CartRow, lines: Vec<CartLineRow>) -> Result<Cart, String> {
    let lines = lines
        .into_iter()
        .map(CartLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Cart::from_parts(
        CartId::from_uuid(row.id),
        ShopId::from_uuid(row.shop_id),
        parse_status("cart status", &row.status)?,
        customer_refs(row.profile_id, row.contact_id),
        lines,
        row.created_at,
    ))
}

// ---------------------------------------------------------------------------
// Order models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrderRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub order_number: String,
    pub idempotency_key: String,
    pub status: String,
    pub payment_status: String,
    pub fulfilment_status: String,
    pub profile_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub subtotal_currency: String,
    pub subtotal_units: i64,
    pub subtotal_nanos: i32,
    pub total_currency: String,
    pub total_units: i64,
    pub total_nanos: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub(crate) struct NewOrderRow<'a> {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub order_number: &'a str,
    pub idempotency_key: &'a str,
    pub status: &'a str,
    pub payment_status: &'a str,
    pub fulfilment_status: &'a str,
    pub profile_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub subtotal_currency: String,
    pub subtotal_units: i64,
    pub subtotal_nanos: i32,
    pub total_currency: String,
    pub total_units: i64,
    pub total_nanos: i32,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Order> for NewOrderRow<'a> {
    fn from(order: &'a Order) -> Self {
        let customer = order.customer();
        let statuses = order.statuses();
        let subtotal = order.subtotal();
        let total = order.total();
        Self {
            id: *order.id().as_uuid(),
            shop_id: *order.shop_id().as_uuid(),
            order_number: order.order_number().as_ref(),
            idempotency_key: order.idempotency_key().as_ref(),
            status: statuses.status.as_str(),
            payment_status: statuses.payment_status.as_str(),
            fulfilment_status: statuses.fulfilment_status.as_str(),
            profile_id: customer.profile_id.map(|id| *id.as_uuid()),
            contact_id: customer.contact_id.map(|id| *id.as_uuid()),
            address_id: order.address_id().map(|id| *id.as_uuid()),
            subtotal_currency: subtotal.currency().to_string(),
            subtotal_units: subtotal.units(),
            subtotal_nanos: subtotal.nanos(),
            total_currency: total.currency().to_string(),
            total_units: total.units(),
            total_nanos: total.nanos(),
            created_at: order.created_at(),
        }
    }
}

/// Changeset for the status columns, the only mutable part of an order.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = orders)]
pub(crate) struct OrderStatusUpdate {
    pub status: &'static str,
    pub payment_status: &'static str,
    pub fulfilment_status: &'static str,
}

impl From<OrderStatuses> for OrderStatusUpdate {
    fn from(statuses: OrderStatuses) -> Self {
        Self {
            status: statuses.status.as_str(),
            payment_status: statuses.payment_status.as_str(),
            fulfilment_status: statuses.fulfilment_status.as_str(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = order_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub unit_price_currency: String,
    pub unit_price_units: i64,
    pub unit_price_nanos: i32,
    pub quantity: i64,
    pub line_total_currency: String,
    pub line_total_units: i64,
    pub line_total_nanos: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = String;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        Ok(OrderLine {
            id: OrderLineId::from_uuid(row.id),
            variant_id: VariantId::from_uuid(row.variant_id),
            sku_snapshot: row.sku_snapshot,
            name_snapshot: row.name_snapshot,
            unit_price: money_from_columns(
                "unit price",
                &row.unit_price_currency,
                row.unit_price_units,
                row.unit_price_nanos,
            )?,
            quantity: quantity_from_column("order line quantity", row.quantity)?,
            line_total: money_from_columns(
                "line total",
                &row.line_total_currency,
                row.line_total_units,
                row.line_total_nanos,
            )?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_lines)]
pub(crate) struct NewOrderLineRow<'a> {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub variant_id: Uuid,
    pub sku_snapshot: &'a str,
    pub name_snapshot: &'a str,
    pub unit_price_currency: String,
    pub unit_price_units: i64,
    pub unit_price_nanos: i32,
    pub quantity: i64,
    pub line_total_currency: String,
    pub line_total_units: i64,
    pub line_total_nanos: i32,
}

/// Insert rows for every line of `order`, numbered in caller order.
pub(crate) fn new_order_line_rows(order: &Order) -> Result<Vec<NewOrderLineRow<'_>>, String> {
    order
        .lines()
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let position =
                i32::try_from(index).map_err(|_| "order has too many lines".to_owned())?;
            Ok(NewOrderLineRow {
                id: *line.id.as_uuid(),
                order_id: *order.id().as_uuid(),
                position,
                variant_id: *line.variant_id.as_uuid(),
                sku_snapshot: &line.sku_snapshot,
                name_snapshot: &line.name_snapshot,
                unit_price_currency: line.unit_price.currency().to_string(),
                unit_price_units: line.unit_price.units(),
                unit_price_nanos: line.unit_price.nanos(),
                quantity: line.quantity.get(),
                line_total_currency: line.line_total.currency().to_string(),
                line_total_units: line.line_total.units(),
                line_total_nanos: line.line_total.nanos(),
            })
        })
        .collect()
}

/// Assemble an order from its header and lines (already in `position` order).
pub(crate) fn order_from_rows(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<Order, String> {
    let lines = lines
        .into_iter()
        .map(OrderLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let idempotency_key = IdempotencyKey::new(row.idempotency_key)
        .map_err(|err| format!("invalid idempotency key: {err}"))?;
    Ok(Order::from_parts(StoredOrder {
        id: OrderId::from_uuid(row.id),
        shop_id: ShopId::from_uuid(row.shop_id),
        order_number: OrderNumber::from_stored(row.order_number),
        idempotency_key,
        statuses: OrderStatuses {
            status: parse_status("order status", &row.status)?,
            payment_status: parse_status("payment status", &row.payment_status)?,
            fulfilment_status: parse_status("fulfilment status", &row.fulfilment_status)?,
        },
        customer: customer_refs(row.profile_id, row.contact_id),
        address_id: row.address_id.map(AddressId::from_uuid),
        subtotal: money_from_columns(
            "subtotal",
            &row.subtotal_currency,
            row.subtotal_units,
            row.subtotal_nanos,
        )?,
        total: money_from_columns("total", &row.total_currency, row.total_units, row.total_nanos)?,
        lines,
        created_at: row.created_at,
    }))
}

// ---------------------------------------------------------------------------
// Fulfilment models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = fulfilments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FulfilmentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fulfilments)]
pub(crate) struct NewFulfilmentRow<'a> {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: &'a str,
    pub carrier: Option<&'a str>,
    pub tracking_number: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Fulfilment> for NewFulfilmentRow<'a> {
    fn from(fulfilment: &'a Fulfilment) -> Self {
        Self {
            id: *fulfilment.id().as_uuid(),
            order_id: *fulfilment.order_id().as_uuid(),
            status: fulfilment.status().as_str(),
            carrier: fulfilment.carrier(),
            tracking_number: fulfilment.tracking_number(),
            created_at: fulfilment.created_at(),
            shipped_at: fulfilment.shipped_at(),
            delivered_at: fulfilment.delivered_at(),
        }
    }
}

/// Changeset for the mutable fulfilment columns; `None` clears a column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = fulfilments)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct FulfilmentUpdate<'a> {
    pub status: &'a str,
    pub carrier: Option<&'a str>,
    pub tracking_number: Option<&'a str>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a Fulfilment> for FulfilmentUpdate<'a> {
    fn from(fulfilment: &'a Fulfilment) -> Self {
        Self {
            status: fulfilment.status().as_str(),
            carrier: fulfilment.carrier(),
            tracking_number: fulfilment.tracking_number(),
            shipped_at: fulfilment.shipped_at(),
            delivered_at: fulfilment.delivered_at(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = fulfilment_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FulfilmentLineRow {
    pub id: Uuid,
    pub fulfilment_id: Uuid,
    pub order_line_id: Uuid,
    pub quantity: i64,
}

impl TryFrom<FulfilmentLineRow> for FulfilmentLine {
    type Error = String;

    fn try_from(row: FulfilmentLineRow) -> Result<Self, Self::Error> {
        Ok(FulfilmentLine {
            id: FulfilmentLineId::from_uuid(row.id),
            order_line_id: OrderLineId::from_uuid(row.order_line_id),
            quantity: quantity_from_column("fulfilment line quantity", row.quantity)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = fulfilment_lines)]
pub(crate) struct NewFulfilmentLineRow {
    pub id: Uuid,
    pub fulfilment_id: Uuid,
    pub order_line_id: Uuid,
    pub position: i32,
    pub quantity: i64,
}

pub(crate) fn new_fulfilment_line_rows(
    fulfilment: &Fulfilment,
) -> Result<Vec<NewFulfilmentLineRow>, String> {
    fulfilment
        .lines()
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let position =
                i32::try_from(index).map_err(|_| "fulfilment has too many lines".to_owned())?;
            Ok(NewFulfilmentLineRow {
                id: *line.id.as_uuid(),
                fulfilment_id: *fulfilment.id().as_uuid(),
                order_line_id: *line.order_line_id.as_uuid(),
                position,
                quantity: line.quantity.get(),
            })
        })
        .collect()
}

/// Assemble a fulfilment from its header and lines (already in `position` order).
pub(crate) fn fulfilment_from_rows(
    row: FulfilmentRow,
    lines: Vec<FulfilmentLineRow>,
) -> Result<Fulfilment, String> {
    let lines = lines
        .into_iter()
        .map(FulfilmentLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Fulfilment::from_parts(StoredFulfilment {
        id: FulfilmentId::from_uuid(row.id),
        order_id: OrderId::from_uuid(row.order_id),
        status: parse_status("fulfilment status", &row.status)?,
        carrier: row.carrier,
        tracking_number: row.tracking_number,
        lines,
        created_at: row.created_at,
        shipped_at: row.shipped_at,
        delivered_at: row.delivered_at,
    }))
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
