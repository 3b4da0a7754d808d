//! Domain primitives, aggregates, ports, and services.
//!
//! Purpose: Define the strongly typed commerce model (money, carts, orders,
//! fulfilments) and the services that enforce its invariants. Keep types
//! immutable where the model says so and document invariants and
//! serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - Money (alias to `money::Money`): exact fixed-point amount.
//! - Cart, Order, Fulfilment: the three lifecycle aggregates.
//! - CatalogService, CartService, OrderService, FulfilmentService: driving
//!   port implementations.

pub mod cart;
pub mod catalog;
pub mod error;
pub mod fulfilment;
pub mod idempotency;
pub mod ids;
pub mod money;
pub mod order;
pub mod ports;
pub mod quantity;
pub mod slug;
pub mod status;

mod cart_service;
mod catalog_service;
mod fulfilment_service;
mod order_service;
mod service_errors;

pub use self::cart::{Cart, CartError, CartLine, CustomerRefs};
pub use self::cart_service::CartService;
pub use self::catalog::{
    CatalogValidationError, MAX_NAME_LEN, Product, Shop, Variant, VariantDraft,
};
pub use self::catalog_service::CatalogService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::fulfilment::{
    FulfilledQuantities, Fulfilment, FulfilmentChanges, FulfilmentError, FulfilmentLine,
    StoredFulfilment, check_fulfilment,
};
pub use self::fulfilment_service::{FulfilmentField, FulfilmentService};
pub use self::idempotency::{
    IdempotencyKey, IdempotencyKeyValidationError, MAX_IDEMPOTENCY_KEY_LEN,
};
pub use self::ids::{
    AddressId, CartId, CartLineId, ContactId, FulfilmentId, FulfilmentLineId, IdValidationError,
    OrderId, OrderLineId, ProductId, ProfileId, ShopId, VariantId,
};
pub use self::money::{CurrencyCode, Money, MoneyError, NANOS_PER_UNIT};
pub use self::order::{
    Order, OrderDraft, OrderLine, OrderNumber, OrderPricing, OrderStatuses, PricedOrder,
    PricingError, StoredOrder,
};
pub use self::order_service::{OrderListingConfig, OrderService};
pub use self::quantity::{Quantity, QuantityError};
pub use self::slug::{ShopSlug, SlugValidationError};
pub use self::status::{
    CartStatus, FulfilmentStatus, OrderStatus, ParseStatusError, PaymentStatus,
};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use commerce::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<()> {
///     Err(Error::not_found("order missing"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
