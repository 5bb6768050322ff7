//! Table listing and schema inspection

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::DatabaseArgs;

#[derive(Parser, Debug)]
pub struct TablesArgs {
    #[command(flatten)]
    pub db: DatabaseArgs,

    /// Show the columns of this table instead of listing tables
    #[arg(long, value_name = "TABLE")]
    pub schema: Option<String>,

    /// Emit JSON instead of plain text
    #[arg(long)]
    pub json: bool,
}

pub async fn run_tables(args: TablesArgs) -> Result<()> {
    let db = args.db.connect().await?;

    match args.schema.as_deref() {
        Some(name) => {
            let table = db
                .table(name)
                .await
                .with_context(|| format!("Failed to load schema for '{}'", name))?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(table.columns())?);
            } else {
                for col in table.columns() {
                    let null = if col.nullable { "NULL" } else { "NOT NULL" };
                    println!("{:<32} {:<28} {}", col.column_name, col.data_type, null);
                }
            }
        }
        None => {
            let tables = db.list_tables().await.context("Failed to list tables")?;

            if args.json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for name in &tables {
                    println!("{}", name);
                }
            }
        }
    }

    Ok(())
}
