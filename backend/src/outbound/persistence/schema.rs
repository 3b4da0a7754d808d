//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Shops own products, carts and orders.
    shops (id) {
        id -> Uuid,
        name -> Text,
        /// Unique URL-safe handle.
        slug -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        shop_id -> Uuid,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Purchasable variants; `stock_quantity` is only ever changed through
    /// conditional `UPDATE` statements.
    product_variants (id) {
        id -> Uuid,
        product_id -> Uuid,
        /// Denormalised owning shop, copied from the product.
        shop_id -> Uuid,
        sku -> Text,
        name -> Text,
        price_currency -> Text,
        price_units -> Int8,
        price_nanos -> Int4,
        /// Never negative (`CHECK (stock_quantity >= 0)`).
        stock_quantity -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    carts (id) {
        id -> Uuid,
        shop_id -> Uuid,
        /// One of `active`, `converted`, `abandoned`.
        status -> Text,
        profile_id -> Nullable<Uuid>,
        contact_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// At most one line per `(cart_id, variant_id)`.
    cart_lines (id) {
        id -> Uuid,
        cart_id -> Uuid,
        variant_id -> Uuid,
        quantity -> Int8,
        /// Insertion order, assigned by the database.
        seq -> Int8,
    }
}

diesel::table! {
    /// Order headers. `order_number` and `idempotency_key` are unique.
    orders (id) {
        id -> Uuid,
        shop_id -> Uuid,
        order_number -> Text,
        idempotency_key -> Text,
        status -> Text,
        payment_status -> Text,
        fulfilment_status -> Text,
        profile_id -> Nullable<Uuid>,
        contact_id -> Nullable<Uuid>,
        address_id -> Nullable<Uuid>,
        subtotal_currency -> Text,
        subtotal_units -> Int8,
        subtotal_nanos -> Int4,
        total_currency -> Text,
        total_units -> Int8,
        total_nanos -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable price and catalog snapshots, ordered by `position`.
    order_lines (id) {
        id -> Uuid,
        order_id -> Uuid,
        position -> Int4,
        variant_id -> Uuid,
        sku_snapshot -> Text,
        name_snapshot -> Text,
        unit_price_currency -> Text,
        unit_price_units -> Int8,
        unit_price_nanos -> Int4,
        quantity -> Int8,
        line_total_currency -> Text,
        line_total_units -> Int8,
        line_total_nanos -> Int4,
    }
}

diesel::table! {
    fulfilments (id) {
        id -> Uuid,
        order_id -> Uuid,
        /// One of `pending`, `shipped`, `delivered`.
        status -> Text,
        carrier -> Nullable<Text>,
        tracking_number -> Nullable<Text>,
        created_at -> Timestamptz,
        shipped_at -> Nullable<Timestamptz>,
        delivered_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    fulfilment_lines (id) {
        id -> Uuid,
        fulfilment_id -> Uuid,
        order_line_id -> Uuid,
        position -> Int4,
        quantity -> Int8,
    }
}

diesel::joinable!(products -> shops (shop_id));
diesel::joinable!(product_variants -> products (product_id));
diesel::joinable!(carts -> shops (shop_id));
diesel::joinable!(cart_lines -> carts (cart_id));
diesel::joinable!(cart_lines -> product_variants (variant_id));
diesel::joinable!(orders -> shops (shop_id));
diesel::joinable!(order_lines -> orders (order_id));
diesel::joinable!(order_lines -> product_variants (variant_id));
diesel::joinable!(fulfilments -> orders (order_id));
diesel::joinable!(fulfilment_lines -> fulfilments (fulfilment_id));
diesel::joinable!(fulfilment_lines -> order_lines (order_line_id));

diesel::allow_tables_to_appear_in_same_query!(
    shops,
    products,
    product_variants,
    carts,
    cart_lines,
    orders,
    order_lines,
    fulfilments,
    fulfilment_lines,
);
