use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gnindex_schema::{index_name, Action, ColumnDef, FunctionRegistry, IndexSpec};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    engine::{nullability, Engine, Transaction},
    error::{Result, StoreError},
    record::{AppliedMigration, MigrationId},
    store::Store,
};

/// Simulated database schema plus the applied-migration records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tables: BTreeMap<String, BTreeMap<String, ColumnDef>>,
    indexes: BTreeMap<String, IndexSpec>,
    functions: FunctionRegistry,
    raw: Vec<String>,
    records: BTreeMap<MigrationId, DateTime<Utc>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table that exists before any migration runs.
    pub fn with_table<I>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = ColumnDef>,
    {
        self.tables.insert(
            table.into(),
            columns
                .into_iter()
                .map(|column| (column.name.to_owned(), column))
                .collect(),
        );
        self
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnDef> {
        self.tables.get(table).and_then(|columns| columns.get(column))
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.column(table, column).is_some()
    }

    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.get(name)
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn raw_statements(&self) -> &[String] {
        &self.raw
    }

    pub fn records(&self) -> Vec<AppliedMigration> {
        self.records
            .iter()
            .map(|(id, applied_at)| AppliedMigration {
                migration_id: *id,
                applied_at: *applied_at,
            })
            .collect()
    }

    pub fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::CreateTable { table, columns } => {
                if self.tables.contains_key(table) {
                    return Err(StoreError::AlreadyExists(format!("table `{table}`")));
                }

                *self = std::mem::take(self).with_table(table.to_owned(), columns.iter().cloned());
            }
            Action::DropTable { table } => {
                if self.tables.remove(table).is_none() {
                    return Err(StoreError::NotFound(format!("table `{table}`")));
                }

                self.drop_indexes_where(|spec| &spec.relation == table);
            }
            Action::AddColumn { table, column } => {
                let columns = self.table_mut(table)?;

                if columns.contains_key(&column.name) {
                    return Err(StoreError::AlreadyExists(format!(
                        "column `{table}.{}`",
                        column.name
                    )));
                }

                columns.insert(column.name.to_owned(), column.clone());
            }
            Action::DropColumn { table, column } => {
                if self.table_mut(table)?.remove(column).is_none() {
                    return Err(StoreError::NotFound(format!("column `{table}.{column}`")));
                }

                self.drop_indexes_where(|spec| {
                    &spec.relation == table && spec.columns.contains(column)
                });
            }
            Action::ChangeColumnNull {
                table,
                column,
                nullable,
            } => {
                let def = self
                    .table_mut(table)?
                    .get_mut(column)
                    .ok_or_else(|| StoreError::NotFound(format!("column `{table}.{column}`")))?;

                if def.nullable == *nullable {
                    return Err(StoreError::AlreadyExists(nullability(table, column, *nullable)));
                }

                def.nullable = *nullable;
            }
            Action::CreateIndex(spec) => {
                let name = index_name(spec)?;

                if self.indexes.contains_key(&name) {
                    return Err(StoreError::AlreadyExists(format!("index `{name}`")));
                }

                let columns = self
                    .tables
                    .get(&spec.relation)
                    .ok_or_else(|| StoreError::NotFound(format!("table `{}`", spec.relation)))?;

                if let Some(missing) = spec.columns.iter().find(|c| !columns.contains_key(*c)) {
                    return Err(StoreError::NotFound(format!(
                        "column `{}.{missing}`",
                        spec.relation
                    )));
                }

                self.functions.track_index(&name, spec);
                self.indexes.insert(name, spec.clone());
            }
            Action::DropIndex { name } => {
                if self.indexes.remove(name).is_none() {
                    return Err(StoreError::NotFound(format!("index `{name}`")));
                }

                self.functions.release_index(name);
            }
            Action::CreateFunction(function) => {
                self.functions.register(function.clone())?;
            }
            Action::DropFunction(signature) => {
                let registered = self
                    .functions
                    .get(&signature.name)
                    .map(|function| function.arguments == signature.arguments);

                if registered != Some(true) {
                    return Err(StoreError::NotFound(format!("function `{signature}`")));
                }

                self.functions.drop_normalization_function(&signature.name)?;
            }
            Action::Raw { sql } => self.raw.push(sql.to_owned()),
        }

        Ok(())
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut BTreeMap<String, ColumnDef>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound(format!("table `{table}`")))
    }

    fn drop_indexes_where(&mut self, predicate: impl Fn(&IndexSpec) -> bool) {
        let names = self
            .indexes
            .iter()
            .filter(|(_, spec)| predicate(spec))
            .map(|(name, _)| name.to_owned())
            .collect::<Vec<_>>();

        for name in names {
            self.indexes.remove(&name);
            self.functions.release_index(&name);
        }
    }
}

/// In-process engine. Transactions work on a copy of the catalog and publish
/// it on commit; an async mutex keeps them strictly sequential.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    catalog: Arc<RwLock<Catalog>>,
    lock: Arc<Mutex<()>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            lock: Arc::default(),
        }
    }

    /// Snapshot of the committed state.
    pub fn catalog(&self) -> Catalog {
        self.catalog.read().clone()
    }

    pub fn store(&self) -> Store {
        Store::new(self.clone())
    }
}

#[async_trait]
impl Engine for Memory {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = self.lock.clone().lock_owned().await;
        let working = self.catalog.read().clone();

        Ok(Box::new(MemoryTransaction {
            working,
            target: self.catalog.clone(),
            _guard: guard,
        }))
    }

    async fn applied(&self) -> Result<Vec<AppliedMigration>> {
        Ok(self.catalog.read().records())
    }
}

pub struct MemoryTransaction {
    working: Catalog,
    target: Arc<RwLock<Catalog>>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn execute(&mut self, action: &Action) -> Result<()> {
        tracing::debug!(?action, "memory: executing schema action");

        self.working.apply(action)
    }

    async fn is_applied(&mut self, id: MigrationId) -> Result<bool> {
        Ok(self.working.records.contains_key(&id))
    }

    async fn mark_applied(&mut self, id: MigrationId, applied_at: DateTime<Utc>) -> Result<()> {
        if self.working.records.contains_key(&id) {
            return Err(StoreError::DuplicateRecord(id));
        }

        self.working.records.insert(id, applied_at);

        Ok(())
    }

    async fn unmark(&mut self, id: MigrationId) -> Result<()> {
        self.working
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::RecordNotFound(id))
    }

    async fn list_applied(&mut self) -> Result<Vec<MigrationId>> {
        Ok(self.working.records.keys().copied().collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            working, target, ..
        } = *self;

        *target.write() = working;

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
