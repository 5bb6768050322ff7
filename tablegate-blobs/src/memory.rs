//! In-process blob store

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::{check_key, etag, Blob, BlobEntry, BlobStore, Metadata, WriteOutcome};

struct Stored {
    blob: Blob,
    etag: String,
}

/// Blob store held in memory; contents are lost on drop.
pub struct MemoryBlobStore {
    name: String,
    blobs: RwLock<BTreeMap<String, Stored>>,
}

impl MemoryBlobStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blobs: RwLock::new(BTreeMap::new()),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>> {
        check_key(key)?;
        Ok(self.blobs.read().await.get(key).map(|s| s.blob.clone()))
    }

    async fn set(&self, key: &str, data: Vec<u8>, metadata: Metadata) -> Result<WriteOutcome> {
        check_key(key)?;
        let etag = etag(&data);

        let mut blobs = self.blobs.write().await;
        let modified = blobs.get(key).map_or(true, |s| s.etag != etag);
        blobs.insert(
            key.to_owned(),
            Stored {
                blob: Blob { data, metadata },
                etag: etag.clone(),
            },
        );

        Ok(WriteOutcome { modified, etag })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobEntry>> {
        let prefix = prefix.unwrap_or_default();
        Ok(self
            .blobs
            .read()
            .await
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, s)| BlobEntry {
                key: key.clone(),
                etag: s.etag.clone(),
            })
            .collect())
    }
}
