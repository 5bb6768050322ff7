//! HTTP server command
//!
//! Runs the tablegate REST API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tablegate_server::{run_server, ServerConfig, SqlPolicy};

use crate::config::DatabaseArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Address to bind to
    #[arg(long, short = 'b', env = "TABLEGATE_BIND", default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long, env = "TABLEGATE_CORS_PERMISSIVE")]
    pub cors_permissive: bool,

    /// Statements accepted by POST /query: select-only or unrestricted
    #[arg(long, env = "TABLEGATE_SQL_POLICY", default_value = "unrestricted")]
    pub sql_policy: SqlPolicy,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    tracing::info!("Starting tablegate server on {}", args.bind);

    let db = args.db.connect().await?;

    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
        sql_policy: args.sql_policy,
    };

    run_server(db, config).await.context("Server error")?;

    Ok(())
}
