use gnindex_migrator::MigrateError;
use gnindex_schema::SchemaError;
use gnindex_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config `{0}`")]
    Config(String),

    #[error("resolver `{0}`")]
    Resolver(String),

    #[error(transparent)]
    Migrate(#[from] MigrateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("serde_json `{0}`")]
    SerdeJson(#[from] serde_json::Error),

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
