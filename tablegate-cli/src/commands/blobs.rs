//! Blob store inspection and build-data management

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tablegate_blobs::service::STORE_NAMES;
use tablegate_blobs::{BlobService, BlobStore};

#[derive(Parser, Debug)]
pub struct BlobsArgs {
    /// Root directory holding one subdirectory per store
    #[arg(long, env = "TABLEGATE_BLOB_ROOT")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: BlobsCommand,
}

#[derive(Subcommand, Debug)]
pub enum BlobsCommand {
    /// List keys and etags in a store
    List {
        /// Store name (user-data, api-cache, file-uploads, build-data)
        store: String,
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Print a blob's metadata and content
    Get {
        /// Store name
        store: String,
        key: String,
    },
    /// Delete a blob
    Delete {
        /// Store name
        store: String,
        key: String,
    },
    /// Store a JSON document in build-data
    PutBuild {
        key: String,
        /// JSON document
        json: String,
    },
    /// Print a build-data document
    GetBuild { key: String },
}

fn lookup<'a>(blobs: &'a BlobService, name: &str) -> Result<&'a dyn BlobStore> {
    blobs.store(name).ok_or_else(|| {
        anyhow!(
            "unknown store '{}' (expected one of: {})",
            name,
            STORE_NAMES.join(", ")
        )
    })
}

pub async fn run_blobs(args: BlobsArgs) -> Result<()> {
    let blobs = BlobService::on_disk(&args.root);

    match args.command {
        BlobsCommand::List { store, prefix } => {
            let entries = lookup(&blobs, &store)?.list(prefix.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        BlobsCommand::Get { store, key } => {
            let blob = lookup(&blobs, &store)?
                .get(&key)
                .await?
                .with_context(|| format!("no blob '{}' in '{}'", key, store))?;

            let content = match serde_json::from_slice::<Value>(&blob.data) {
                Ok(value) => value,
                Err(_) => Value::String(String::from_utf8_lossy(&blob.data).into_owned()),
            };
            let out = json!({ "key": key, "metadata": blob.metadata, "content": content });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        BlobsCommand::Delete { store, key } => {
            lookup(&blobs, &store)?.delete(&key).await?;
            tracing::info!(store = %store, key = %key, "blob deleted");
        }
        BlobsCommand::PutBuild { key, json } => {
            let data: Value = serde_json::from_str(&json).context("Invalid JSON document")?;
            let outcome = blobs.store_build_data(&key, &data).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        BlobsCommand::GetBuild { key } => {
            let data = blobs
                .get_build_data(&key)
                .await?
                .with_context(|| format!("no build data '{}'", key))?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
    }

    Ok(())
}
