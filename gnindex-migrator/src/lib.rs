//! Ordered, reversible schema migrations.
//!
//! A [`MigrationUnit`] pairs an id with an `up` [`Operation`] and an optional
//! `down`. Units live in a [`Registry`] ordered by id; a [`Runner`] applies the
//! pending ones (or reverts applied ones) against a
//! [`Store`](gnindex_store::Store), one transaction per unit.
//!
//! ```rust,ignore
//! let memory = gnindex_store::Memory::new();
//! let mut runner = Runner::new(gnindex_migrator::catalog()?, memory.store());
//!
//! let report = runner.migrate_up(None).await?;
//! runner.migrate_down(MigrationId(0)).await?;
//! ```
//!
//! [`catalog`] returns the built-in Global Names index migrations.
//!
//! [`Operation`]: gnindex_schema::Operation
#![forbid(unsafe_code)]

mod catalog;
mod error;
mod registry;
mod runner;
mod unit;

pub mod table;

pub use catalog::*;
pub use error::*;
pub use registry::*;
pub use runner::*;
pub use unit::*;
