//! One-shot database health probe

use anyhow::{bail, Result};
use clap::Parser;

use crate::config::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct HealthArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,
}

/// Print the health report as JSON; exits non-zero when unhealthy.
pub async fn run_health(args: HealthArgs) -> Result<()> {
    let db = args.db.connect().await?;
    let report = db.health_check().await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_healthy() {
        bail!("database is unhealthy");
    }
    Ok(())
}
