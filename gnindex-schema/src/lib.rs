//! Schema building blocks for the Global Names index database.
//!
//! Migrations are plain data: an [`Operation`] is an ordered list of
//! [`Action`]s (add a column, create a trigram index, define an accent-folding
//! function, ...). Store engines interpret actions; [`Action::to_sql`] renders
//! the PostgreSQL statement for each of them.
//!
//! - [`IndexSpec`], [`build_create_statement`], [`build_drop_statement`] -
//!   B-tree and GIN trigram indexes with deterministic names
//! - [`FunctionRegistry`], [`NormalizationFunction`] - shared normalization
//!   functions that cannot be dropped while an index still calls them
//! - [`ColumnDef`] - column definitions rendered through `sea-query`
#![forbid(unsafe_code)]

mod action;
mod column;
mod error;
mod function;
mod ident;
mod index;

pub use action::*;
pub use column::*;
pub use error::*;
pub use function::*;
pub use ident::{is_identifier, MAX_IDENTIFIER_LEN};
pub use index::*;
