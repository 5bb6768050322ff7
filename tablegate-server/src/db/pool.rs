//! Database connection management
//!
//! One sqlx `PgPool` for ordinary statements and, when configured, one
//! dedicated connection reserved for transactions.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::error::DbError;
use super::executor::DedicatedConnection;
use super::service::DatabaseService;

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for [`DatabaseService::connect`]
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Pooled connection string
    pub database_url: String,
    /// Optional dedicated connection string for transactions
    pub unpooled_url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            unpooled_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Create a PostgreSQL connection pool.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/app").await?;
/// ```
pub async fn create_pool(database_url: &str) -> Result<PgPool, DbError> {
    create_pool_with_options(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Create a PostgreSQL connection pool with custom options.
pub async fn create_pool_with_options(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

impl DatabaseService {
    /// Connect the pool and, if configured, the dedicated transaction connection.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        let pool = create_pool_with_options(&config.database_url, config.max_connections).await?;
        let mut service = Self::new(pool);

        match config.unpooled_url.as_deref() {
            Some(url) => {
                let dedicated = DedicatedConnection::connect(url).await?;
                service = service.with_unpooled(dedicated);
                tracing::info!("unpooled connection ready for transactions");
            }
            None => tracing::debug!("no unpooled connection configured; transactions disabled"),
        }

        Ok(service)
    }
}
