use sea_query::{Alias, ColumnDef as SeaColumnDef, Expr};
use serde::{Deserialize, Serialize};

/// Column types used by the index database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    SmallInteger,
    Integer,
    BigInteger,
    /// `varchar(n)`, unbounded when `None`.
    String(Option<u32>),
    Text,
    Uuid,
    Timestamp,
}

/// Definition of a column for `add-column` and `create-table` actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
    /// Raw SQL expression, e.g. `false` or `now()`.
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    pub fn small_integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::SmallInteger)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn big_integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::BigInteger)
    }

    pub fn string(name: impl Into<String>, len: u32) -> Self {
        Self::new(name, ColumnType::String(Some(len)))
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Uuid)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, expression: impl Into<String>) -> Self {
        self.default = Some(expression.into());
        self
    }

    pub(crate) fn to_sea(&self) -> SeaColumnDef {
        let mut def = SeaColumnDef::new(Alias::new(&self.name));

        match self.column_type {
            ColumnType::Boolean => def.boolean(),
            ColumnType::SmallInteger => def.small_integer(),
            ColumnType::Integer => def.integer(),
            ColumnType::BigInteger => def.big_integer(),
            ColumnType::String(Some(len)) => def.string_len(len),
            ColumnType::String(None) => def.string(),
            ColumnType::Text => def.text(),
            ColumnType::Uuid => def.uuid(),
            ColumnType::Timestamp => def.timestamp_with_time_zone(),
        };

        if self.nullable {
            def.null();
        } else {
            def.not_null();
        }

        if self.primary_key {
            def.primary_key();
        }

        if let Some(default) = &self.default {
            def.default(Expr::cust(default));
        }

        def
    }
}
