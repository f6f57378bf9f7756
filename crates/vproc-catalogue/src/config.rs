//! Catalogue connection settings.

use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

use crate::error::{CatalogueError, CatalogueResult};

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct CatalogueConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Maximum pool size
    pub max_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
}

impl CatalogueConfig {
    /// Load from `DB_*` environment variables.
    pub fn from_env() -> CatalogueResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| CatalogueError::config_error(format!("{} not set", name)))
        };

        Ok(Self {
            host: required("DB_HOST")?,
            port: std::env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            user: required("DB_USER")?,
            password: required("DB_PASS")?,
            database: required("DB_NAME")?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            acquire_timeout: Duration::from_secs(5),
        })
    }

    /// Connection options for sqlx.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}
