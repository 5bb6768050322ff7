//! Database layer - execution primitive, statement builders, service
//!
//! # Design Principles
//!
//! - One [`Executor`] seam; driver errors never cross it
//! - Identifiers reach SQL text only through a catalog-checked [`TableRef`]
//! - Values always travel as `$n` parameters
//! - Transactions own the dedicated connection from BEGIN to COMMIT/ROLLBACK

pub mod error;
pub mod executor;
pub mod pool;
pub mod service;
pub mod statement;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use error::DbError;
pub use executor::{DedicatedConnection, Executor, Row};
pub use pool::{create_pool, create_pool_with_options, DatabaseConfig, DEFAULT_MAX_CONNECTIONS};
pub use service::{DatabaseService, RowPage};
pub use statement::{Statement, TableRef};
pub use transaction::Transaction;
