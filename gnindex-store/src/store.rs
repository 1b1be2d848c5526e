use chrono::{DateTime, Utc};
use gnindex_schema::Action;

use crate::{
    engine::{Engine, Transaction},
    error::Result,
    record::{AppliedMigration, MigrationId},
};

/// Handle over an [`Engine`]. Every method except [`Store::begin`] runs in
/// a transaction of its own.
#[derive(Clone)]
pub struct Store {
    pub(crate) engine: Box<dyn Engine>,
}

impl Store {
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    pub async fn setup(&self) -> Result<()> {
        self.engine.setup().await
    }

    pub async fn begin(&self) -> Result<Box<dyn Transaction>> {
        self.engine.begin().await
    }

    pub async fn is_applied(&self, id: MigrationId) -> Result<bool> {
        let mut tx = self.engine.begin().await?;
        let applied = tx.is_applied(id).await;

        tx.rollback().await?;

        applied
    }

    pub async fn mark_applied(&self, id: MigrationId, applied_at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.engine.begin().await?;

        if let Err(err) = tx.mark_applied(id, applied_at).await {
            tx.rollback().await?;

            return Err(err);
        }

        tx.commit().await
    }

    pub async fn unmark(&self, id: MigrationId) -> Result<()> {
        let mut tx = self.engine.begin().await?;

        if let Err(err) = tx.unmark(id).await {
            tx.rollback().await?;

            return Err(err);
        }

        tx.commit().await
    }

    /// Applied ids, ascending.
    pub async fn list_applied(&self) -> Result<Vec<MigrationId>> {
        Ok(self
            .engine
            .applied()
            .await?
            .into_iter()
            .map(|record| record.migration_id)
            .collect())
    }

    pub async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        self.engine.applied().await
    }

    /// Runs a single action outside of any migration.
    pub async fn execute(&self, action: &Action) -> Result<()> {
        let mut tx = self.engine.begin().await?;

        if let Err(err) = tx.execute(action).await {
            tx.rollback().await?;

            return Err(err);
        }

        tx.commit().await
    }
}
