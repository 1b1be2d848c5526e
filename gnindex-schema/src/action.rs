use sea_query::{Alias, ColumnDef as SeaColumnDef, PostgresQueryBuilder, Table};
use serde::{Deserialize, Serialize};

use crate::{
    column::ColumnDef,
    error::Result,
    function::{drop_function_statement, FunctionSignature, NormalizationFunction},
    ident::validate_identifier,
    index::{build_create_statement, build_drop_statement, index_name, IndexSpec},
};

/// A single schema change. Actions are not idempotent: applying one whose
/// effect is already present is an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
    },
    ChangeColumnNull {
        table: String,
        column: String,
        nullable: bool,
    },
    CreateIndex(IndexSpec),
    DropIndex {
        name: String,
    },
    CreateFunction(NormalizationFunction),
    DropFunction(FunctionSignature),
    Raw {
        sql: String,
    },
}

impl Action {
    /// PostgreSQL statement for this action.
    pub fn to_sql(&self) -> Result<String> {
        let statement = match self {
            Action::CreateTable { table, columns } => {
                validate_identifier(table)?;
                let mut statement = Table::create();
                statement.table(Alias::new(table));
                for column in columns {
                    validate_identifier(&column.name)?;
                    statement.col(&mut column.to_sea());
                }
                statement.to_string(PostgresQueryBuilder)
            }
            Action::DropTable { table } => {
                validate_identifier(table)?;
                Table::drop()
                    .table(Alias::new(table))
                    .to_owned()
                    .to_string(PostgresQueryBuilder)
            }
            Action::AddColumn { table, column } => {
                validate_identifier(table)?;
                validate_identifier(&column.name)?;
                Table::alter()
                    .table(Alias::new(table))
                    .add_column(&mut column.to_sea())
                    .to_owned()
                    .to_string(PostgresQueryBuilder)
            }
            Action::DropColumn { table, column } => {
                validate_identifier(table)?;
                validate_identifier(column)?;
                Table::alter()
                    .table(Alias::new(table))
                    .drop_column(Alias::new(column))
                    .to_owned()
                    .to_string(PostgresQueryBuilder)
            }
            Action::ChangeColumnNull {
                table,
                column,
                nullable,
            } => {
                validate_identifier(table)?;
                validate_identifier(column)?;
                let mut def = SeaColumnDef::new(Alias::new(column));
                if *nullable {
                    def.null();
                } else {
                    def.not_null();
                }
                Table::alter()
                    .table(Alias::new(table))
                    .modify_column(&mut def)
                    .to_owned()
                    .to_string(PostgresQueryBuilder)
            }
            Action::CreateIndex(spec) => build_create_statement(spec)?,
            Action::DropIndex { name } => {
                validate_identifier(name)?;
                build_drop_statement(name)
            }
            Action::CreateFunction(function) => function.create_statement()?,
            Action::DropFunction(signature) => drop_function_statement(signature)?,
            Action::Raw { sql } => sql.to_owned(),
        };

        Ok(statement)
    }

    /// The action that undoes this one, when it can be derived without loss.
    pub fn inverse(&self) -> Option<Action> {
        match self {
            Action::CreateTable { table, .. } => Some(Action::DropTable {
                table: table.to_owned(),
            }),
            Action::AddColumn { table, column } => Some(Action::DropColumn {
                table: table.to_owned(),
                column: column.name.to_owned(),
            }),
            Action::ChangeColumnNull {
                table,
                column,
                nullable,
            } => Some(Action::ChangeColumnNull {
                table: table.to_owned(),
                column: column.to_owned(),
                nullable: !nullable,
            }),
            Action::CreateIndex(spec) => index_name(spec)
                .ok()
                .map(|name| Action::DropIndex { name }),
            Action::CreateFunction(function) => Some(Action::DropFunction(function.signature())),
            Action::DropTable { .. }
            | Action::DropColumn { .. }
            | Action::DropIndex { .. }
            | Action::DropFunction(_)
            | Action::Raw { .. } => None,
        }
    }
}

/// Ordered list of actions executed as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation(Vec<Action>);

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: Action) -> Self {
        self.0.push(action);
        self
    }

    pub fn create_table<I>(self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = ColumnDef>,
    {
        self.action(Action::CreateTable {
            table: table.into(),
            columns: columns.into_iter().collect(),
        })
    }

    pub fn drop_table(self, table: impl Into<String>) -> Self {
        self.action(Action::DropTable {
            table: table.into(),
        })
    }

    pub fn add_column(self, table: impl Into<String>, column: ColumnDef) -> Self {
        self.action(Action::AddColumn {
            table: table.into(),
            column,
        })
    }

    pub fn drop_column(self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.action(Action::DropColumn {
            table: table.into(),
            column: column.into(),
        })
    }

    pub fn change_column_null(
        self,
        table: impl Into<String>,
        column: impl Into<String>,
        nullable: bool,
    ) -> Self {
        self.action(Action::ChangeColumnNull {
            table: table.into(),
            column: column.into(),
            nullable,
        })
    }

    pub fn create_index(self, spec: IndexSpec) -> Self {
        self.action(Action::CreateIndex(spec))
    }

    pub fn drop_index(self, name: impl Into<String>) -> Self {
        self.action(Action::DropIndex { name: name.into() })
    }

    pub fn create_function(self, function: NormalizationFunction) -> Self {
        self.action(Action::CreateFunction(function))
    }

    pub fn drop_function(self, signature: FunctionSignature) -> Self {
        self.action(Action::DropFunction(signature))
    }

    pub fn raw(self, sql: impl Into<String>) -> Self {
        self.action(Action::Raw { sql: sql.into() })
    }

    pub fn actions(&self) -> &[Action] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Undo operation: every action inverted, in reverse order. `None` when any
    /// action has no inverse.
    pub fn inverse(&self) -> Option<Operation> {
        self.0
            .iter()
            .rev()
            .map(Action::inverse)
            .collect::<Option<Vec<_>>>()
            .map(Operation)
    }

    pub fn to_sql(&self) -> Result<Vec<String>> {
        self.0.iter().map(Action::to_sql).collect()
    }
}

impl FromIterator<Action> for Operation {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Operation {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
