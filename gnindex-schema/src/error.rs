/// Errors raised while validating or rendering schema definitions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid index spec: {0}")]
    InvalidSpec(String),

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("function `{0}` already registered")]
    DuplicateFunction(String),

    #[error("function `{0}` not found")]
    FunctionNotFound(String),

    #[error("function `{function}` still referenced by {}", indexes.join(", "))]
    StillReferenced {
        function: String,
        indexes: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
