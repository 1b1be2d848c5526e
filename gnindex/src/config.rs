//! Connection settings for the PostgreSQL engine.

use std::time::Duration;

use crate::error::{Error, Result};

/// Prefix of the record table, `{prefix}_migrations`.
pub const DEFAULT_TABLE_PREFIX: &str = "gnindex";

/// Migrations run one at a time; a single connection is enough.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 1;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub table_prefix: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            table_prefix: DEFAULT_TABLE_PREFIX.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl Config {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self::default().database_url(database_url)
    }

    pub fn database_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    pub fn table_prefix(mut self, table_prefix: impl Into<String>) -> Self {
        self.table_prefix = table_prefix.into();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("database url is empty".to_owned()));
        }

        if !gnindex_schema::is_identifier(&self.table_prefix) {
            return Err(Error::Config(format!(
                "table prefix `{}` is not a lowercase identifier",
                self.table_prefix
            )));
        }

        if self.max_connections == 0 {
            return Err(Error::Config("max connections must be at least 1".to_owned()));
        }

        Ok(())
    }
}
