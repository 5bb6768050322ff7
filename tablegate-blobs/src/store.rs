//! Blob store seam
//!
//! A store maps string keys to bytes plus a JSON metadata object. Every write
//! reports the content etag (md5 hex) and whether the stored content changed.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BlobError, Result};

/// Free-form metadata stored next to a blob
pub type Metadata = Map<String, Value>;

/// Stored content plus its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub metadata: Metadata,
}

impl Blob {
    /// Decode the content as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

/// Result of a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub modified: bool,
    pub etag: String,
}

/// One listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobEntry {
    pub key: String,
    pub etag: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store name, e.g. `user-data`
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Blob>>;

    async fn set(&self, key: &str, data: Vec<u8>, metadata: Metadata) -> Result<WriteOutcome>;

    /// Remove a blob. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Entries whose key starts with `prefix`, sorted by key.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobEntry>>;
}

/// md5 hex digest of the content
pub fn etag(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(BlobError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Serialize `value` as JSON and store it.
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
    metadata: Metadata,
) -> Result<WriteOutcome> {
    let data = serde_json::to_vec(value)?;
    store.set(key, data, metadata).await
}

/// Load and decode a JSON blob.
pub async fn get_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(blob) => Ok(Some(blob.json()?)),
        None => Ok(None),
    }
}
