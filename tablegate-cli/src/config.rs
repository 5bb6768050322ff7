//! Shared connection arguments
//!
//! Every flag falls back to an environment variable; `.env` in the working
//! directory is loaded before parsing.

use anyhow::{Context, Result};
use clap::Args;
use tablegate_server::db::DEFAULT_MAX_CONNECTIONS;
use tablegate_server::{DatabaseConfig, DatabaseService};

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Pooled Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Dedicated connection string used for transactions
    #[arg(long, env = "DATABASE_URL_UNPOOLED", hide_env_values = true)]
    pub unpooled_url: Option<String>,

    /// Maximum pooled connections
    #[arg(long, env = "TABLEGATE_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub fn to_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            database_url: self.database_url.clone(),
            unpooled_url: self.unpooled_url.clone(),
            max_connections: self.max_connections,
        }
    }

    pub async fn connect(&self) -> Result<DatabaseService> {
        DatabaseService::connect(&self.to_config())
            .await
            .context("Failed to connect to database")
    }
}
