//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`VariantStockGateway`]) are implemented by
//! outbound adapters; driving ports (`*Command`, `*Query`) are implemented
//! by the domain services and consumed by inbound adapters such as the
//! operator CLI.

mod macros;
pub(crate) use macros::define_port_error;

mod cart_command;
mod cart_repository;
mod catalog_command;
mod catalog_repository;
mod fulfilment_command;
mod fulfilment_repository;
mod order_command;
mod order_query;
mod order_repository;
mod variant_stock_gateway;

pub use cart_command::{
    AddCartLineRequest, CartCommand, CartQuery, CreateCartRequest, RemoveCartLineRequest,
};
#[cfg(test)]
pub use cart_command::{MockCartCommand, MockCartQuery};
#[cfg(test)]
pub use cart_repository::MockCartRepository;
pub use cart_repository::{CartRepository, CartRepositoryError, FixtureCartRepository};
pub use catalog_command::{
    AdjustStockRequest, CatalogCommand, CatalogQuery, CreateProductRequest, CreateShopRequest,
    CreateVariantRequest,
};
#[cfg(test)]
pub use catalog_command::{MockCatalogCommand, MockCatalogQuery};
#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
pub use catalog_repository::{
    CatalogRepository, CatalogRepositoryError, FixtureCatalogRepository,
};
pub use fulfilment_command::{
    CreateFulfilmentRequest, FulfilmentCommand, FulfilmentLineRequest, FulfilmentQuery,
    UpdateFulfilmentRequest,
};
#[cfg(test)]
pub use fulfilment_command::{MockFulfilmentCommand, MockFulfilmentQuery};
#[cfg(test)]
pub use fulfilment_repository::MockFulfilmentRepository;
pub use fulfilment_repository::{
    FixtureFulfilmentRepository, FulfilmentRepository, FulfilmentRepositoryError,
};
#[cfg(test)]
pub use order_command::MockOrderCommand;
pub use order_command::{
    CreateOrderFromCartRequest, CreateOrderRequest, CreateOrderResponse, OrderCommand,
    OrderLineRequest,
};
#[cfg(test)]
pub use order_query::MockOrderQuery;
pub use order_query::{ListOrdersRequest, OrderQuery};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{
    FixtureOrderRepository, OrderPage, OrderRepository, OrderRepositoryError,
};
#[cfg(test)]
pub use variant_stock_gateway::MockVariantStockGateway;
pub use variant_stock_gateway::{
    FixtureVariantStockGateway, VariantStockError, VariantStockGateway,
};

#[cfg(test)]
mod tests;
