use gnindex_schema::SchemaError;
use gnindex_store::{MigrationId, StoreError};

use crate::runner::RunnerState;

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("migration {0} is already registered")]
    DuplicateId(MigrationId),

    #[error("migration {0} is not registered")]
    NotFound(MigrationId),

    #[error("migration {0} has no down operation")]
    Irreversible(MigrationId),

    #[error("runner is {0}, expected idle")]
    InvalidState(RunnerState),

    #[error("migration {id} failed: {source}")]
    TransactionFailure {
        id: MigrationId,
        #[source]
        source: StoreError,
    },

    #[error("store `{0}`")]
    Store(#[from] StoreError),

    #[error("schema `{0}`")]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
