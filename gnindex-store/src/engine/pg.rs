use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gnindex_schema::Action;
use sea_query::{Alias, ColumnDef, Expr, PostgresQueryBuilder, Table};
use sqlx::{PgPool, Postgres};

use crate::{
    engine::{nullability, Engine, Transaction},
    error::{Result, StoreError},
    record::{AppliedMigration, MigrationId},
    store::Store,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    prefix: Option<String>,
}

impl PgStore {
    pub fn new(pool: &PgPool) -> Store {
        Store::new(Self {
            pool: pool.clone(),
            prefix: None,
        })
    }

    pub fn with_prefix(pool: &PgPool, prefix: impl Into<String>) -> Store {
        Store::new(Self {
            pool: pool.clone(),
            prefix: Some(prefix.into()),
        })
    }

    pub fn table(&self, name: impl Into<String>) -> String {
        format!(
            "{}_{}",
            self.prefix.as_deref().unwrap_or("gnindex"),
            name.into()
        )
    }

    pub fn table_migrations(&self) -> String {
        self.table("migrations")
    }
}

#[async_trait]
impl Engine for PgStore {
    async fn setup(&self) -> Result<()> {
        let statement = Table::create()
            .table(Alias::new(self.table_migrations()))
            .if_not_exists()
            .col(
                ColumnDef::new(Alias::new("migration_id"))
                    .big_integer()
                    .not_null()
                    .primary_key(),
            )
            .col(
                ColumnDef::new(Alias::new("applied_at"))
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .to_owned()
            .to_string(PostgresQueryBuilder);

        sqlx::query(&statement).execute(&self.pool).await?;

        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let table = self.table_migrations();
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&table)
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgTransaction { tx, table }))
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        let table = self.table_migrations();
        let records = sqlx::query_as::<_, AppliedMigration>(&format!(
            "SELECT migration_id, applied_at FROM {table} ORDER BY migration_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    table: String,
}

impl PgTransaction {
    async fn referencing_indexes(&mut self, function: &str) -> Result<Vec<String>> {
        let indexes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT indexname FROM pg_indexes
            WHERE indexdef ~ $1
            ORDER BY indexname
            "#,
        )
        .bind(format!(r"\m{function}\s*\("))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(indexes)
    }

    /// PostgreSQL accepts a repeated `SET NOT NULL`, so the current state is
    /// checked first.
    async fn is_nullable(&mut self, table: &str, column: &str) -> Result<Option<bool>> {
        let is_nullable = sqlx::query_scalar::<_, String>(
            r#"
            SELECT is_nullable FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(is_nullable.map(|value| value == "YES"))
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn execute(&mut self, action: &Action) -> Result<()> {
        let statement = action.to_sql()?;

        if let Action::DropFunction(signature) = action {
            let indexes = self.referencing_indexes(&signature.name).await?;

            if !indexes.is_empty() {
                return Err(StoreError::StillReferenced {
                    function: signature.name.to_owned(),
                    indexes,
                });
            }
        }

        if let Action::ChangeColumnNull {
            table,
            column,
            nullable,
        } = action
        {
            match self.is_nullable(table, column).await? {
                None => return Err(StoreError::NotFound(describe(action))),
                Some(current) if current == *nullable => {
                    return Err(StoreError::AlreadyExists(nullability(
                        table, column, *nullable,
                    )));
                }
                Some(_) => {}
            }
        }

        tracing::debug!(%statement, "pg: executing schema action");

        sqlx::raw_sql(&statement)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| classify(err, action))?;

        Ok(())
    }

    async fn is_applied(&mut self, id: MigrationId) -> Result<bool> {
        let table = &self.table;
        let found = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT migration_id FROM {table} WHERE migration_id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(found.is_some())
    }

    async fn mark_applied(&mut self, id: MigrationId, applied_at: DateTime<Utc>) -> Result<()> {
        if self.is_applied(id).await? {
            return Err(StoreError::DuplicateRecord(id));
        }

        let table = &self.table;

        sqlx::query(&format!(
            "INSERT INTO {table} (migration_id, applied_at) VALUES ($1, $2)"
        ))
        .bind(id)
        .bind(applied_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| match sqlstate(&err).as_deref() {
            Some("23505") => StoreError::DuplicateRecord(id),
            _ => StoreError::Sqlx(err),
        })?;

        Ok(())
    }

    async fn unmark(&mut self, id: MigrationId) -> Result<()> {
        let table = &self.table;
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE migration_id = $1"))
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound(id));
        }

        Ok(())
    }

    async fn list_applied(&mut self) -> Result<Vec<MigrationId>> {
        let table = &self.table;
        let ids = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT migration_id FROM {table} ORDER BY migration_id ASC"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(ids.into_iter().map(MigrationId).collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;

        Ok(())
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    err.as_database_error()
        .and_then(|err| err.code())
        .map(|code| code.into_owned())
}

// https://www.postgresql.org/docs/current/errcodes-appendix.html
fn classify(err: sqlx::Error, action: &Action) -> StoreError {
    match sqlstate(&err).as_deref() {
        Some("42P07" | "42701" | "42710" | "42723") => StoreError::AlreadyExists(describe(action)),
        Some("42P01" | "42703" | "42704" | "42883") => StoreError::NotFound(describe(action)),
        Some("2BP01") => match action {
            Action::DropFunction(signature) => StoreError::StillReferenced {
                function: signature.name.to_owned(),
                indexes: vec![],
            },
            _ => StoreError::Sqlx(err),
        },
        _ => StoreError::Sqlx(err),
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::CreateTable { table, .. } | Action::DropTable { table } => {
            format!("table `{table}`")
        }
        Action::AddColumn { table, column } => format!("column `{table}.{}`", column.name),
        Action::DropColumn { table, column } | Action::ChangeColumnNull { table, column, .. } => {
            format!("column `{table}.{column}`")
        }
        Action::CreateIndex(spec) => match gnindex_schema::index_name(spec) {
            Ok(name) => format!("index `{name}`"),
            Err(_) => format!("index on `{}`", spec.relation),
        },
        Action::DropIndex { name } => format!("index `{name}`"),
        Action::CreateFunction(function) => format!("function `{}`", function.signature()),
        Action::DropFunction(signature) => format!("function `{signature}`"),
        Action::Raw { .. } => "statement".to_owned(),
    }
}
