//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories and the stock gateway,
//!   using Diesel with `diesel-async`.
//!
//! Adapters are thin translators between domain types and storage rows.
//! They contain no business logic.

pub mod persistence;
