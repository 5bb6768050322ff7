//! tablegate-server: generic REST access to a Postgres database
//!
//! Lists tables, describes their columns, pages through rows, does row CRUD
//! by id, and runs raw SQL, all behind a small JSON API.
//!
//! ```ignore
//! use tablegate_server::{run_server, DatabaseConfig, DatabaseService, ServerConfig};
//!
//! let db = DatabaseService::connect(&DatabaseConfig::new(url)).await?;
//! run_server(db, ServerConfig::default()).await?;
//! ```

pub mod db;
pub mod http;
pub mod models;

pub use db::{DatabaseConfig, DatabaseService, DbError, Executor, Row, Transaction};
pub use http::{build_router, run_server, ApiError, AppState, ServerConfig, ServerError};
pub use models::{HealthReport, HealthStatus, SqlPolicy, ValidationError};
