use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Utc;
use gnindex_schema::Operation;
use gnindex_store::{AppliedMigration, MigrationId, Store, StoreError, Transaction};
use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{
    error::{MigrateError, Result},
    registry::Registry,
    unit::MigrationUnit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RunnerState {
    #[display("idle")]
    Idle,
    #[display("applying {0}")]
    Applying(MigrationId),
    #[display("rolling back {0}")]
    RollingBack(MigrationId),
    #[display("failed at {0}")]
    Failed(MigrationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, FromStr)]
#[display(style = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Outcome of a completed (possibly cancelled) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub direction: Direction,
    pub completed: Vec<MigrationId>,
    pub cancelled: bool,
}

impl Report {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            completed: vec![],
            cancelled: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Applied records, ascending.
    pub applied: Vec<AppliedMigration>,
    /// Registered units not applied yet, ascending.
    pub pending: Vec<MigrationId>,
    /// Applied ids with no registered unit.
    pub unknown: Vec<MigrationId>,
}

/// Requests a running batch to stop once the current unit is done.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

pub struct Runner {
    registry: Registry,
    store: Store,
    state: RunnerState,
    cancel: CancelHandle,
}

impl Runner {
    pub fn new(registry: Registry, store: Store) -> Self {
        Self {
            registry,
            store,
            state: RunnerState::Idle,
            cancel: CancelHandle::default(),
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Acknowledges a failure and makes the runner usable again.
    pub fn reset(&mut self) {
        if self.state != RunnerState::Idle {
            tracing::warn!(state = %self.state, "runner reset");
        }

        self.state = RunnerState::Idle;
    }

    pub async fn status(&self) -> Result<Status> {
        let applied = self.store.applied().await?;
        let pending = self
            .registry
            .ordered()
            .filter(|unit| !applied.iter().any(|r| r.migration_id == unit.id))
            .map(|unit| unit.id)
            .collect();
        let unknown = applied
            .iter()
            .map(|r| r.migration_id)
            .filter(|id| !self.registry.contains(*id))
            .collect();

        Ok(Status {
            applied,
            pending,
            unknown,
        })
    }

    /// Units `migrate_up(target)` would apply, in order.
    pub async fn plan_up(&self, target: Option<MigrationId>) -> Result<Vec<&MigrationUnit>> {
        let applied = self.store.list_applied().await?;

        Ok(self
            .registry
            .ordered()
            .filter(|unit| target.map_or(true, |target| unit.id <= target))
            .filter(|unit| !applied.contains(&unit.id))
            .collect())
    }

    /// Units `migrate_down(target)` would revert, in order. Fails like the run
    /// itself would on an unknown or irreversible unit.
    pub async fn plan_down(&self, target: MigrationId) -> Result<Vec<&MigrationUnit>> {
        let mut units = vec![];

        for id in self.applied_above(target).await? {
            let unit = self.registry.get(id)?;

            if unit.down.is_none() {
                return Err(MigrateError::Irreversible(id));
            }

            units.push(unit);
        }

        Ok(units)
    }

    /// Applies every pending unit up to and including `target` (all of them
    /// when `None`), one transaction per unit. Stops at the first failure.
    pub async fn migrate_up(&mut self, target: Option<MigrationId>) -> Result<Report> {
        self.ensure_idle()?;

        let units = self
            .plan_up(target)
            .await?
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let mut report = Report::new(Direction::Up);

        for unit in units {
            self.state = RunnerState::Applying(unit.id);

            tracing::info!(id = %unit.id, description = %unit.description, "applying migration");

            if let Err(source) = self.apply(&unit).await {
                self.state = RunnerState::Failed(unit.id);

                tracing::error!(id = %unit.id, error = %source, "migration failed, rolled back");

                return Err(MigrateError::TransactionFailure {
                    id: unit.id,
                    source,
                });
            }

            self.state = RunnerState::Idle;
            report.completed.push(unit.id);

            if self.cancel.take() {
                tracing::warn!(id = %unit.id, "migrate up cancelled");
                report.cancelled = true;
                break;
            }
        }

        Ok(report)
    }

    /// Reverts every applied unit above `target`, newest first.
    pub async fn migrate_down(&mut self, target: MigrationId) -> Result<Report> {
        self.ensure_idle()?;

        let mut report = Report::new(Direction::Down);

        for id in self.applied_above(target).await? {
            self.state = RunnerState::RollingBack(id);

            let down = match self.registry.get(id) {
                Ok(MigrationUnit {
                    down: Some(down), ..
                }) => down.clone(),
                Ok(_) => {
                    self.state = RunnerState::Failed(id);
                    tracing::error!(%id, "migration is irreversible");

                    return Err(MigrateError::Irreversible(id));
                }
                Err(err) => {
                    self.state = RunnerState::Failed(id);
                    tracing::error!(%id, "applied migration is not registered");

                    return Err(err);
                }
            };

            tracing::info!(%id, "reverting migration");

            if let Err(source) = self.revert(id, &down).await {
                self.state = RunnerState::Failed(id);

                tracing::error!(%id, error = %source, "revert failed, rolled back");

                return Err(MigrateError::TransactionFailure { id, source });
            }

            self.state = RunnerState::Idle;
            report.completed.push(id);

            if self.cancel.take() {
                tracing::warn!(%id, "migrate down cancelled");
                report.cancelled = true;
                break;
            }
        }

        Ok(report)
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            RunnerState::Idle => Ok(()),
            state => Err(MigrateError::InvalidState(state)),
        }
    }

    async fn applied_above(&self, target: MigrationId) -> Result<Vec<MigrationId>> {
        let applied = self.store.list_applied().await?;

        Ok(applied.into_iter().rev().filter(|id| *id > target).collect())
    }

    async fn apply(&self, unit: &MigrationUnit) -> std::result::Result<(), StoreError> {
        let mut tx = self.store.begin().await?;

        let result = async {
            if tx.is_applied(unit.id).await? {
                return Err(StoreError::DuplicateRecord(unit.id));
            }

            execute_all(tx.as_mut(), &unit.up).await?;
            tx.mark_applied(unit.id, Utc::now()).await
        }
        .await;

        finish(tx, result).await
    }

    async fn revert(&self, id: MigrationId, down: &Operation) -> std::result::Result<(), StoreError> {
        let mut tx = self.store.begin().await?;

        let result = async {
            execute_all(tx.as_mut(), down).await?;
            tx.unmark(id).await
        }
        .await;

        finish(tx, result).await
    }
}

async fn execute_all(
    tx: &mut dyn Transaction,
    operation: &Operation,
) -> std::result::Result<(), StoreError> {
    for action in operation {
        tracing::debug!(?action, "executing action");
        tx.execute(action).await?;
    }

    Ok(())
}

async fn finish(
    tx: Box<dyn Transaction>,
    result: std::result::Result<(), StoreError>,
) -> std::result::Result<(), StoreError> {
    match result {
        Ok(()) => tx.commit().await,
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback failed");
            }

            Err(err)
        }
    }
}
