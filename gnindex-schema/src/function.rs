//! Reusable text-normalization functions and their reference bookkeeping.
//!
//! A normalization function (e.g. accent folding with `unaccent`) is defined
//! once and shared by every index and query that needs it. A function cannot be
//! dropped while a live index expression still calls it.

use std::collections::{BTreeMap, BTreeSet};

use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SchemaError},
    ident::validate_identifier,
    index::IndexSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "snake_case")]
#[display(style = "lowercase")]
pub enum FunctionLanguage {
    Sql,
    #[display("plpgsql")]
    PlPgSql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, FromStr)]
#[serde(rename_all = "snake_case")]
#[display(style = "UPPERCASE")]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

/// Name plus argument types: what PostgreSQL needs to identify a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub arguments: Vec<String>,
}

impl FunctionSignature {
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationFunction {
    pub name: String,
    pub arguments: Vec<String>,
    pub returns: String,
    pub body: String,
    pub language: FunctionLanguage,
    pub volatility: Volatility,
}

impl NormalizationFunction {
    /// A `text -> text` SQL function, immutable so it can back an index.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: vec!["text".to_owned()],
            returns: "text".to_owned(),
            body: body.into(),
            language: FunctionLanguage::Sql,
            volatility: Volatility::Immutable,
        }
    }

    pub fn language(mut self, language: FunctionLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn volatility(mut self, volatility: Volatility) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn signature(&self) -> FunctionSignature {
        FunctionSignature::new(self.name.to_owned(), self.arguments.iter().cloned())
    }

    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.name)?;

        if self.body.trim().is_empty() {
            return Err(SchemaError::InvalidSpec(format!(
                "function `{}` has an empty body",
                self.name
            )));
        }

        Ok(())
    }

    pub fn create_statement(&self) -> Result<String> {
        self.validate()?;

        Ok(format!(
            "CREATE FUNCTION {} RETURNS {} AS $func$ {} $func$ LANGUAGE {} {}",
            self.signature(),
            self.returns,
            self.body.trim(),
            self.language,
            self.volatility
        ))
    }
}

pub fn drop_function_statement(signature: &FunctionSignature) -> Result<String> {
    validate_identifier(&signature.name)?;

    Ok(format!("DROP FUNCTION {signature}"))
}

/// Functions currently defined, and which live indexes call each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, NormalizationFunction>,
    references: BTreeMap<String, BTreeSet<String>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_normalization_function(
        &mut self,
        name: impl Into<String>,
        sql_body: impl Into<String>,
    ) -> Result<&NormalizationFunction> {
        let function = NormalizationFunction::new(name, sql_body);
        let name = function.name.to_owned();
        self.register(function)?;

        self.get(&name)
            .ok_or_else(|| SchemaError::FunctionNotFound(name.to_owned()))
    }

    pub fn register(&mut self, function: NormalizationFunction) -> Result<()> {
        function.validate()?;

        if self.functions.contains_key(&function.name) {
            return Err(SchemaError::DuplicateFunction(function.name));
        }

        self.functions.insert(function.name.to_owned(), function);

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&NormalizationFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Indexes whose expression calls `name`.
    pub fn referencing_indexes(&self, name: &str) -> Vec<String> {
        self.references
            .get(name)
            .map(|indexes| indexes.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Records that live index `index_name` calls every registered function its
    /// expression references.
    pub fn track_index(&mut self, index_name: &str, spec: &IndexSpec) {
        for function in self.functions.keys() {
            if spec.references(function) {
                self.references
                    .entry(function.to_owned())
                    .or_default()
                    .insert(index_name.to_owned());
            }
        }
    }

    pub fn release_index(&mut self, index_name: &str) {
        self.references.retain(|_, indexes| {
            indexes.remove(index_name);
            !indexes.is_empty()
        });
    }

    pub fn drop_normalization_function(&mut self, name: &str) -> Result<NormalizationFunction> {
        let indexes = self.referencing_indexes(name);

        if !indexes.is_empty() {
            return Err(SchemaError::StillReferenced {
                function: name.to_owned(),
                indexes,
            });
        }

        self.functions
            .remove(name)
            .ok_or_else(|| SchemaError::FunctionNotFound(name.to_owned()))
    }

    pub fn create_statement(&self, name: &str) -> Result<String> {
        self.get(name)
            .ok_or_else(|| SchemaError::FunctionNotFound(name.to_owned()))?
            .create_statement()
    }

    pub fn drop_statement(&self, name: &str) -> Result<String> {
        let function = self
            .get(name)
            .ok_or_else(|| SchemaError::FunctionNotFound(name.to_owned()))?;

        drop_function_statement(&function.signature())
    }
}
