//! Declarative index specifications and their `CREATE INDEX` / `DROP INDEX` statements.
//!
//! Two index methods are used by the name index:
//!
//! - **B-tree** indexes serve equality, range and prefix lookups as well as
//!   foreign-key style joins (e.g. `data_source_id` + `taxon_id` for filtered
//!   lookups). Column order matters: a predicate can only use the index when it
//!   constrains the leading column(s).
//! - **GIN trigram** indexes (`pg_trgm`) serve fuzzy substring and similarity
//!   search over free-text taxonomic names: scientific names, canonical forms and
//!   the decomposed name parts (author words, genus, species, subspecies,
//!   uninomial, year). They cover exactly one column or one expression.
//!
//! Index names are derived from the spec, so the statement that drops an index
//! never needs stored metadata:
//!
//! ```
//! use gnindex_schema::{build_create_statement, build_drop_statement, index_name, IndexSpec};
//!
//! let spec = IndexSpec::btree("name_string_indices", ["data_source_id", "taxon_id"]);
//!
//! assert_eq!(
//!     build_create_statement(&spec).unwrap(),
//!     r#"CREATE INDEX "name_string_indices__data_source_id_taxon_id__btree_idx" ON "name_string_indices" USING BTREE ("data_source_id", "taxon_id")"#
//! );
//! assert_eq!(
//!     build_drop_statement(&index_name(&spec).unwrap()),
//!     r#"DROP INDEX "name_string_indices__data_source_id_taxon_id__btree_idx""#
//! );
//! ```

use parse_display::{Display, FromStr};
use sea_query::{Alias, Index, IndexType, PostgresQueryBuilder};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SchemaError},
    ident::{fit_identifier, is_identifier, validate_identifier, validate_relation},
};

/// Operator class that turns a GIN index into a trigram index.
pub const TRIGRAM_OPERATOR_CLASS: &str = "gin_trgm_ops";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "snake_case")]
pub enum IndexMethod {
    #[display("btree")]
    BTree,
    #[display("gin")]
    GinTrigram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub relation: String,
    pub columns: Vec<String>,
    pub method: IndexMethod,
    /// Indexed expression, e.g. `f_unaccent(name)`. `columns` then lists the
    /// column(s) the expression reads.
    pub expression: Option<String>,
    /// Operator class for B-tree entries, e.g. `text_pattern_ops`. Trigram
    /// indexes always use [`TRIGRAM_OPERATOR_CLASS`].
    pub operator_class: Option<String>,
    /// Explicit name; generated from the other fields when absent.
    pub name: Option<String>,
}

impl IndexSpec {
    pub fn new<I, S>(relation: impl Into<String>, columns: I, method: IndexMethod) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            relation: relation.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            method,
            expression: None,
            operator_class: None,
            name: None,
        }
    }

    pub fn btree<I, S>(relation: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(relation, columns, IndexMethod::BTree)
    }

    pub fn trigram(relation: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(relation, [column.into()], IndexMethod::GinTrigram)
    }

    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    pub fn operator_class(mut self, operator_class: impl Into<String>) -> Self {
        self.operator_class = Some(operator_class.into());
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.relation.is_empty() {
            return Err(SchemaError::InvalidSpec("relation is empty".to_owned()));
        }

        validate_relation(&self.relation)
            .map_err(|_| SchemaError::InvalidSpec(format!("relation `{}`", self.relation)))?;

        if self.columns.is_empty() {
            return Err(SchemaError::InvalidSpec(format!(
                "index on `{}` has no columns",
                self.relation
            )));
        }

        if let Some(column) = self.columns.iter().find(|c| !is_identifier(c)) {
            return Err(SchemaError::InvalidSpec(format!("column `{column}`")));
        }

        if self.method == IndexMethod::GinTrigram && self.columns.len() != 1 {
            return Err(SchemaError::InvalidSpec(format!(
                "trigram index on `{}` must cover exactly one column, got {}",
                self.relation,
                self.columns.len()
            )));
        }

        if matches!(&self.expression, Some(expression) if expression.trim().is_empty()) {
            return Err(SchemaError::InvalidSpec("expression is empty".to_owned()));
        }

        if let Some(operator_class) = &self.operator_class {
            validate_identifier(operator_class)
                .map_err(|_| SchemaError::InvalidSpec(format!("operator class `{operator_class}`")))?;
        }

        if let Some(name) = &self.name {
            validate_identifier(name)
                .map_err(|_| SchemaError::InvalidSpec(format!("index name `{name}`")))?;
        }

        Ok(())
    }

    /// Whether the indexed expression calls `function`.
    pub fn references(&self, function: &str) -> bool {
        let Some(expression) = &self.expression else {
            return false;
        };

        expression.match_indices(function).any(|(pos, _)| {
            let before = expression[..pos].chars().next_back();
            let after = expression[pos + function.len()..].trim_start().chars().next();

            !before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                && after == Some('(')
        })
    }

    fn entries(&self) -> Vec<String> {
        let operator_class = match self.method {
            IndexMethod::GinTrigram => Some(TRIGRAM_OPERATOR_CLASS),
            IndexMethod::BTree => self.operator_class.as_deref(),
        };

        let with_class = |entry: &str| match operator_class {
            Some(class) => format!("{entry} {class}"),
            None => entry.to_owned(),
        };

        match &self.expression {
            Some(expression) => vec![with_class(expression.trim())],
            None => self.columns.iter().map(|c| with_class(c.as_str())).collect(),
        }
    }
}

/// Deterministic index name: the explicit name, or
/// `{relation}__{columns|expression}__{method}_idx`.
pub fn index_name(spec: &IndexSpec) -> Result<String> {
    spec.validate()?;

    if let Some(name) = &spec.name {
        return Ok(name.to_owned());
    }

    let target = match &spec.expression {
        Some(expression) => sanitize(expression),
        None => spec.columns.join("_"),
    };

    Ok(fit_identifier(format!(
        "{}__{}__{}_idx",
        spec.relation.replace('.', "_"),
        target,
        spec.method
    )))
}

/// Plain B-tree column lists go through sea-query. Expressions and operator
/// classes have no sea-query representation and are written out directly.
pub fn build_create_statement(spec: &IndexSpec) -> Result<String> {
    let name = index_name(spec)?;

    if spec.method != IndexMethod::BTree
        || spec.expression.is_some()
        || spec.operator_class.is_some()
    {
        return Ok(format!(
            "CREATE INDEX {name} ON {} USING {} ({})",
            spec.relation,
            spec.method,
            spec.entries().join(", ")
        ));
    }

    let mut statement = Index::create();
    statement.name(name).index_type(IndexType::BTree);

    match spec.relation.split_once('.') {
        Some((schema, table)) => statement.table((Alias::new(schema), Alias::new(table))),
        None => statement.table(Alias::new(&spec.relation)),
    };

    for column in &spec.columns {
        statement.col(Alias::new(column));
    }

    Ok(statement.to_string(PostgresQueryBuilder))
}

pub fn build_drop_statement(index_name: &str) -> String {
    Index::drop()
        .name(index_name)
        .to_owned()
        .to_string(PostgresQueryBuilder)
}

fn sanitize(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());

    for c in expression.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }

    out.trim_matches('_').to_owned()
}
