use gnindex_schema::SchemaError;

use crate::record::MigrationId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("migration {0} is already recorded as applied")]
    DuplicateRecord(MigrationId),

    #[error("migration {0} is not recorded as applied")]
    RecordNotFound(MigrationId),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("function `{function}` is still referenced by {}", indexes.join(", "))]
    StillReferenced {
        function: String,
        indexes: Vec<String>,
    },

    #[error("schema `{0}`")]
    Schema(SchemaError),

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),
}

impl From<SchemaError> for StoreError {
    fn from(value: SchemaError) -> Self {
        match value {
            SchemaError::StillReferenced { function, indexes } => {
                StoreError::StillReferenced { function, indexes }
            }
            SchemaError::DuplicateFunction(name) => {
                StoreError::AlreadyExists(format!("function `{name}`"))
            }
            SchemaError::FunctionNotFound(name) => {
                StoreError::NotFound(format!("function `{name}`"))
            }
            other => StoreError::Schema(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
