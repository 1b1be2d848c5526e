use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gnindex_migrator::{
    catalog, table::Decomposed, Direction, MigrateError, MigrationUnit, Registry, Runner,
    RunnerState,
};
use gnindex_schema::{Action, ColumnDef, IndexSpec, Operation};
use gnindex_store::{AppliedMigration, Engine, MigrationId, Store, StoreError, Transaction};

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Reports an empty record table, like a runner that planned before another
/// one committed.
#[derive(Clone)]
struct StaleReads(Store);

#[async_trait]
impl Engine for StaleReads {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        Ok(Box::new(StaleTransaction(self.0.begin().await?)))
    }

    async fn applied(&self) -> StoreResult<Vec<AppliedMigration>> {
        Ok(vec![])
    }
}

struct StaleTransaction(Box<dyn Transaction>);

#[async_trait]
impl Transaction for StaleTransaction {
    async fn execute(&mut self, action: &Action) -> StoreResult<()> {
        self.0.execute(action).await
    }

    async fn is_applied(&mut self, id: MigrationId) -> StoreResult<bool> {
        self.0.is_applied(id).await
    }

    async fn mark_applied(&mut self, id: MigrationId, applied_at: DateTime<Utc>) -> StoreResult<()> {
        self.0.mark_applied(id, applied_at).await
    }

    async fn unmark(&mut self, id: MigrationId) -> StoreResult<()> {
        self.0.unmark(id).await
    }

    async fn list_applied(&mut self) -> StoreResult<Vec<MigrationId>> {
        Ok(vec![])
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.0.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.0.rollback().await
    }
}

/// Tables the built-in migrations expect to find.
pub fn base_schema() -> Operation {
    let operation = Operation::new()
        .raw("CREATE EXTENSION IF NOT EXISTS pg_trgm")
        .raw("CREATE EXTENSION IF NOT EXISTS unaccent")
        .create_table(
            "data_sources",
            [
                ColumnDef::integer("id").primary_key(),
                ColumnDef::string("title", 255).not_null(),
            ],
        )
        .create_table(
            "name_string_indices",
            [
                ColumnDef::integer("data_source_id").not_null(),
                ColumnDef::string("taxon_id", 255).not_null(),
                ColumnDef::uuid("name_string_id").not_null(),
            ],
        )
        .create_table(
            "name_strings",
            [
                ColumnDef::uuid("id").primary_key(),
                ColumnDef::string("name", 255).not_null(),
                ColumnDef::string("canonical", 255),
            ],
        );

    Decomposed::ALL.iter().fold(operation, |operation, decomposed| {
        operation.create_table(
            decomposed.table(),
            [
                ColumnDef::uuid("name_uuid").not_null(),
                ColumnDef::string(decomposed.column(), 255).not_null(),
            ],
        )
    })
}

async fn create_tables(store: &Store, scope: &str) -> anyhow::Result<()> {
    store
        .execute(&Action::CreateTable {
            table: format!("{scope}_data_sources"),
            columns: vec![ColumnDef::integer("id").primary_key()],
        })
        .await?;

    store
        .execute(&Action::CreateTable {
            table: format!("{scope}_name_string_indices"),
            columns: vec![
                ColumnDef::integer("data_source_id").not_null(),
                ColumnDef::string("taxon_id", 255).not_null(),
            ],
        })
        .await?;

    Ok(())
}

fn quality_units(scope: &str) -> Vec<MigrationUnit> {
    vec![
        MigrationUnit::change(
            MigrationId(1001),
            "add is_curated",
            Operation::new().add_column(
                format!("{scope}_data_sources"),
                ColumnDef::boolean("is_curated"),
            ),
        ),
        MigrationUnit::change(
            MigrationId(1002),
            "data_source_id, taxon_id index",
            Operation::new().create_index(IndexSpec::btree(
                format!("{scope}_name_string_indices"),
                ["data_source_id", "taxon_id"],
            )),
        ),
    ]
}

pub async fn test_migrate_up(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let mut runner = Runner::new(Registry::from_units(quality_units(scope))?, store.clone());
    let report = runner.migrate_up(None).await?;

    assert_eq!(report.direction, Direction::Up);
    assert_eq!(report.completed, vec![MigrationId(1001), MigrationId(1002)]);
    assert!(!report.cancelled);
    assert_eq!(runner.state(), RunnerState::Idle);
    assert_eq!(
        store.list_applied().await?,
        vec![MigrationId(1001), MigrationId(1002)]
    );

    let status = runner.status().await?;
    assert!(status.pending.is_empty());
    assert!(status.unknown.is_empty());
    assert_eq!(status.applied.len(), 2);

    // nothing left to do
    let report = runner.migrate_up(None).await?;
    assert!(report.completed.is_empty());

    Ok(())
}

pub async fn test_round_trip(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let mut runner = Runner::new(Registry::from_units(quality_units(scope))?, store.clone());
    runner.migrate_up(Some(MigrationId(1001))).await?;

    assert_eq!(store.list_applied().await?, vec![MigrationId(1001)]);
    assert_eq!(runner.status().await?.pending, vec![MigrationId(1002)]);

    runner.migrate_up(None).await?;

    let report = runner.migrate_down(MigrationId(0)).await?;

    assert_eq!(report.direction, Direction::Down);
    assert_eq!(report.completed, vec![MigrationId(1002), MigrationId(1001)]);
    assert!(store.list_applied().await?.is_empty());

    // the schema is back too: re-applying succeeds
    runner.migrate_up(None).await?;
    assert_eq!(store.list_applied().await?.len(), 2);

    Ok(())
}

pub async fn test_irreversible(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let registry = Registry::from_units([MigrationUnit::new(
        MigrationId(2001),
        "vacuum",
        Operation::new().raw(format!("ANALYZE {scope}_data_sources")),
    )])?;
    let mut runner = Runner::new(registry, store.clone());
    runner.migrate_up(None).await?;

    let err = runner.plan_down(MigrationId(2000)).await.unwrap_err();
    assert!(matches!(err, MigrateError::Irreversible(MigrationId(2001))));

    let err = runner.migrate_down(MigrationId(2000)).await.unwrap_err();
    assert!(matches!(err, MigrateError::Irreversible(MigrationId(2001))));
    assert_eq!(runner.state(), RunnerState::Failed(MigrationId(2001)));
    assert_eq!(store.list_applied().await?, vec![MigrationId(2001)]);

    let err = runner.migrate_up(None).await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::InvalidState(RunnerState::Failed(MigrationId(2001)))
    ));

    runner.reset();
    assert_eq!(runner.state(), RunnerState::Idle);

    // reverting down to the unit itself touches nothing
    let report = runner.migrate_down(MigrationId(2001)).await?;
    assert!(report.completed.is_empty());

    Ok(())
}

pub async fn test_failure_rolls_back(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let table = format!("{scope}_data_sources");
    let registry = Registry::from_units([
        MigrationUnit::change(
            MigrationId(3001),
            "half done",
            Operation::new()
                .add_column(&table, ColumnDef::integer("record_count"))
                .create_index(IndexSpec::btree(&table, ["missing"])),
        ),
        MigrationUnit::change(
            MigrationId(3002),
            "never reached",
            Operation::new().add_column(&table, ColumnDef::boolean("is_auto_curated")),
        ),
    ])?;
    let mut runner = Runner::new(registry, store.clone());

    let err = runner.migrate_up(None).await.unwrap_err();
    match err {
        MigrateError::TransactionFailure { id, source } => {
            assert_eq!(id, MigrationId(3001));
            assert!(matches!(source, StoreError::NotFound(_)), "{source}");
        }
        err => anyhow::bail!("unexpected error {err}"),
    }

    assert_eq!(runner.state(), RunnerState::Failed(MigrationId(3001)));
    assert!(store.list_applied().await?.is_empty());

    // the first action of 3001 was rolled back with the rest of it
    store
        .execute(&Action::AddColumn {
            table: table.to_owned(),
            column: ColumnDef::integer("record_count"),
        })
        .await?;

    // and 3002 never ran
    store
        .execute(&Action::AddColumn {
            table: table.to_owned(),
            column: ColumnDef::boolean("is_auto_curated"),
        })
        .await?;

    Ok(())
}

pub async fn test_down_failure_stops(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let table = format!("{scope}_data_sources");
    let registry = Registry::from_units([
        MigrationUnit::change(
            MigrationId(4001),
            "add title",
            Operation::new().add_column(&table, ColumnDef::string("title", 255)),
        ),
        MigrationUnit::new(
            MigrationId(4002),
            "add record_count",
            Operation::new().add_column(&table, ColumnDef::integer("record_count")),
        )
        .with_down(
            Operation::new()
                .drop_column(&table, "record_count")
                .drop_index(format!("{scope}_missing_idx")),
        ),
        MigrationUnit::change(
            MigrationId(4003),
            "add is_curated",
            Operation::new().add_column(&table, ColumnDef::boolean("is_curated")),
        ),
    ])?;
    let mut runner = Runner::new(registry, store.clone());
    runner.migrate_up(None).await?;

    let err = runner.migrate_down(MigrationId(0)).await.unwrap_err();
    match err {
        MigrateError::TransactionFailure { id, source } => {
            assert_eq!(id, MigrationId(4002));
            assert!(matches!(source, StoreError::NotFound(_)), "{source}");
        }
        err => anyhow::bail!("unexpected error {err}"),
    }

    assert_eq!(runner.state(), RunnerState::Failed(MigrationId(4002)));
    assert_eq!(
        store.list_applied().await?,
        vec![MigrationId(4001), MigrationId(4002)]
    );

    // 4003 stays reverted
    store
        .execute(&Action::AddColumn {
            table: table.to_owned(),
            column: ColumnDef::boolean("is_curated"),
        })
        .await?;

    // the column dropped by the failed down is back
    let err = store
        .execute(&Action::AddColumn {
            table: table.to_owned(),
            column: ColumnDef::integer("record_count"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)), "{err}");

    Ok(())
}

pub async fn test_stale_plan(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;
    store.mark_applied(MigrationId(1001), Utc::now()).await?;

    let mut runner = Runner::new(
        Registry::from_units(quality_units(scope))?,
        Store::new(StaleReads(store.clone())),
    );

    let err = runner.migrate_up(None).await.unwrap_err();
    match err {
        MigrateError::TransactionFailure { id, source } => {
            assert_eq!(id, MigrationId(1001));
            assert!(
                matches!(source, StoreError::DuplicateRecord(MigrationId(1001))),
                "{source}"
            );
        }
        err => anyhow::bail!("unexpected error {err}"),
    }

    assert_eq!(runner.state(), RunnerState::Failed(MigrationId(1001)));
    assert_eq!(store.list_applied().await?, vec![MigrationId(1001)]);

    // the up of 1001 never ran
    store
        .execute(&Action::AddColumn {
            table: format!("{scope}_data_sources"),
            column: ColumnDef::boolean("is_curated"),
        })
        .await?;

    Ok(())
}

pub async fn test_cancel(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let table = format!("{scope}_data_sources");
    let registry = Registry::from_units(["a", "b", "c"].into_iter().zip(5001..).map(
        |(column, id)| {
            MigrationUnit::change(
                MigrationId(id),
                format!("add {column}"),
                Operation::new().add_column(&table, ColumnDef::boolean(column)),
            )
        },
    ))?;
    let mut runner = Runner::new(registry, store.clone());

    let handle = runner.cancel_handle();
    handle.cancel();
    assert!(handle.is_cancelled());

    let report = runner.migrate_up(None).await?;
    assert!(report.cancelled);
    assert_eq!(report.completed, vec![MigrationId(5001)]);
    assert_eq!(runner.state(), RunnerState::Idle);
    assert!(!handle.is_cancelled());

    let report = runner.migrate_up(None).await?;
    assert!(!report.cancelled);
    assert_eq!(report.completed, vec![MigrationId(5002), MigrationId(5003)]);

    Ok(())
}

pub async fn test_plans(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let mut runner = Runner::new(Registry::from_units(quality_units(scope))?, store.clone());

    let plan = runner.plan_up(Some(MigrationId(1001))).await?;
    assert_eq!(
        plan.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![MigrationId(1001)]
    );

    // planning applies nothing
    assert!(store.list_applied().await?.is_empty());

    runner.migrate_up(None).await?;

    let plan = runner.plan_down(MigrationId(0)).await?;
    assert_eq!(
        plan.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![MigrationId(1002), MigrationId(1001)]
    );
    assert!(runner.plan_up(None).await?.is_empty());

    Ok(())
}

pub async fn test_unknown_applied(store: &Store, scope: &str) -> anyhow::Result<()> {
    create_tables(store, scope).await?;

    let mut runner = Runner::new(Registry::from_units(quality_units(scope))?, store.clone());
    runner.migrate_up(None).await?;
    store
        .mark_applied(MigrationId(9001), Utc::now())
        .await?;

    let status = runner.status().await?;
    assert_eq!(status.unknown, vec![MigrationId(9001)]);

    let err = runner.migrate_down(MigrationId(0)).await.unwrap_err();
    assert!(matches!(err, MigrateError::NotFound(MigrationId(9001))));
    assert_eq!(store.list_applied().await?.len(), 3);

    Ok(())
}

pub async fn test_catalog(store: &Store) -> anyhow::Result<()> {
    for action in &base_schema() {
        store.execute(action).await?;
    }

    let registry = catalog()?;
    let ids = registry.ids();
    let mut runner = Runner::new(registry, store.clone());

    let report = runner.migrate_up(None).await?;
    assert_eq!(report.completed, ids);
    assert_eq!(store.list_applied().await?, ids);

    let report = runner.migrate_down(MigrationId(0)).await?;
    assert_eq!(
        report.completed,
        ids.iter().rev().copied().collect::<Vec<_>>()
    );
    assert!(store.list_applied().await?.is_empty());

    Ok(())
}
