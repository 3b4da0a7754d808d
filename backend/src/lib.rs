//! Commerce order and fulfilment engine.
//!
//! - `domain`: money, catalog, cart, order and fulfilment models plus the
//!   services that enforce their invariants.
//! - `outbound`: PostgreSQL adapters for the domain's driven ports.
//! - `config`: OrthoConfig-backed runtime settings.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
