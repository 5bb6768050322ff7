//! Domain models with validation at construction
//!
//! Caller input (paging parameters, SQL policy values) is validated when
//! these types are built. Invalid input returns ValidationError, not panic.

pub mod column;
pub mod health;
pub mod pagination;
pub mod sql_policy;
pub mod validation;

pub use column::ColumnInfo;
pub use health::{HealthReport, HealthStatus};
pub use pagination::{PageInfo, PageParams, RowWindow, SortDirection};
pub use sql_policy::{require_select, SqlPolicy};
pub use validation::ValidationError;
