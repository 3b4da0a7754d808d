//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the commerce driven ports, backed by
//! PostgreSQL through `diesel-async` and a `bb8` connection pool.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and
//!   domain types. Business rules stay in the domain; the adapters only
//!   re-run [`check_fulfilment`](crate::domain::check_fulfilment) inside the
//!   transaction that persists a fulfilment.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Conditional writes**: stock moves, status updates and cart
//!   conversion are single conditional `UPDATE` statements, never a read
//!   followed by a blind write.
//!
//! # Example
//!
//! ```ignore
//! use commerce::outbound::persistence::{DbPool, DieselOrderRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/commerce")).await?;
//! let orders = DieselOrderRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_cart_repository;
mod diesel_catalog_repository;
mod diesel_fulfilment_repository;
mod diesel_order_repository;
mod diesel_variant_stock_gateway;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_cart_repository::DieselCartRepository;
pub use diesel_catalog_repository::DieselCatalogRepository;
pub use diesel_fulfilment_repository::DieselFulfilmentRepository;
pub use diesel_order_repository::DieselOrderRepository;
pub use diesel_variant_stock_gateway::DieselVariantStockGateway;
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
