//! Database error type

use crate::models::ValidationError;

/// Errors surfaced by the database layer.
///
/// Driver errors never escape as `sqlx::Error`: they are flattened into
/// [`DbError::Query`], which keeps the driver's message behind a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("Database query failed: {message}")]
    Query { message: String },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DbError {
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        let message = match &e {
            sqlx::Error::Database(db) => db.message().to_owned(),
            _ => e.to_string(),
        };
        Self::Query { message }
    }
}
