//! Commerce engine configuration loaded via OrthoConfig.
//!
//! Values come from `COMMERCE_*` environment variables, an optional
//! configuration file and command-line flags, in OrthoConfig's usual
//! precedence order.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::OrderListingConfig;
use crate::outbound::persistence::PoolConfig;

/// Runtime settings for the commerce services and their database pool.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COMMERCE")]
pub struct CommerceSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum number of pooled connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    /// Idle connections kept open.
    #[ortho_config(default = 2)]
    pub pool_min_idle: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = 30)]
    pub connection_timeout_secs: u64,
    /// Orders returned when a listing asks for zero rows.
    #[ortho_config(default = 50)]
    pub default_page_size: i64,
    /// Largest order page a listing may return.
    #[ortho_config(default = 200)]
    pub max_page_size: i64,
}

impl CommerceSettings {
    /// Pool configuration for `database_url` using these sizing settings.
    pub fn pool_config(&self, database_url: impl Into<String>) -> PoolConfig {
        PoolConfig::new(database_url)
            .with_max_size(self.pool_max_size)
            .with_min_idle(Some(self.pool_min_idle))
            .with_connection_timeout(Duration::from_secs(self.connection_timeout_secs))
    }

    /// Order listing policy.
    pub fn listing_config(&self) -> OrderListingConfig {
        OrderListingConfig::new(self.default_page_size, self.max_page_size)
    }
}
