use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;
use gnindex_schema::Action;

use crate::{
    error::Result,
    record::{AppliedMigration, MigrationId},
};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "pg")]
mod pg;

#[cfg(feature = "memory")]
pub use memory::*;
#[cfg(feature = "pg")]
pub use pg::*;

/// A backing store able to run schema actions and keep the applied-migration
/// records, both inside one transaction.
#[async_trait]
pub trait Engine: DynClone + Send + Sync {
    /// Creates whatever the engine needs to keep records. Idempotent.
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Opens a transaction. Engines serialize transactions so that two runners
    /// never interleave on the same record store.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Applied records, ascending by id.
    async fn applied(&self) -> Result<Vec<AppliedMigration>>;
}

dyn_clone::clone_trait_object!(Engine);

/// Unit of atomicity: schema actions and record updates made through one
/// transaction are committed or discarded together. Dropping a transaction
/// without committing discards it.
#[async_trait]
pub trait Transaction: Send {
    async fn execute(&mut self, action: &Action) -> Result<()>;

    async fn is_applied(&mut self, id: MigrationId) -> Result<bool>;

    /// Fails with [`DuplicateRecord`](crate::StoreError::DuplicateRecord) when
    /// `id` is already recorded.
    async fn mark_applied(&mut self, id: MigrationId, applied_at: DateTime<Utc>) -> Result<()>;

    /// Fails with [`RecordNotFound`](crate::StoreError::RecordNotFound) when
    /// `id` is not recorded.
    async fn unmark(&mut self, id: MigrationId) -> Result<()>;

    async fn list_applied(&mut self) -> Result<Vec<MigrationId>>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[cfg(any(feature = "memory", feature = "pg"))]
fn nullability(table: &str, column: &str, nullable: bool) -> String {
    let state = if nullable { "nullable" } else { "not null" };

    format!("column `{table}.{column}` already {state}")
}
