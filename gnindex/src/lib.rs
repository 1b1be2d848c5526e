//! Schema migrations and trigram index management for the Global Names index
//! database.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`schema`] - actions, index builder, normalization functions
//! - [`store`] - applied-migration records and store engines
//! - [`migrator`] - registry, runner and the built-in migrations
//!
//! ```rust,ignore
//! let store = gnindex::connect(&Config::new("postgres://localhost/gnindex")).await?;
//! store.setup().await?;
//!
//! let mut runner = Runner::new(gnindex::catalog()?, store);
//! runner.migrate_up(None).await?;
//! ```
#![forbid(unsafe_code)]

mod config;
mod error;

pub mod resolver;

pub use config::*;
pub use error::*;

pub use gnindex_migrator as migrator;
pub use gnindex_schema as schema;
pub use gnindex_store as store;

pub use gnindex_migrator::{catalog, MigrateError, MigrationUnit, Registry, Runner};
pub use gnindex_store::{MigrationId, Store};

#[cfg(feature = "memory")]
pub use gnindex_store::Memory;

#[cfg(feature = "pg")]
pub use gnindex_store::PgStore;

/// Opens a pool for `config` and returns a store over it. The record table is
/// not created; call [`Store::setup`] for that.
#[cfg(feature = "pg")]
pub async fn connect(config: &Config) -> Result<Store> {
    config.validate()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.database_url)
        .await?;

    tracing::debug!(prefix = %config.table_prefix, "connected to index database");

    Ok(PgStore::with_prefix(&pool, &config.table_prefix))
}
