//! Filesystem blob store
//!
//! Layout under the root directory:
//! - `<root>/<store>/<encoded key>`: content
//! - `<root>/<store>/<encoded key>.meta.json`: etag and metadata
//!
//! Keys are percent-encoded with `.` escaped too, so encoded names never
//! contain a dot and can't collide with sidecars or walk out of the directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;
use crate::store::{check_key, etag, Blob, BlobEntry, BlobStore, Metadata, WriteOutcome};

const SIDECAR_SUFFIX: &str = ".meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    etag: String,
    #[serde(default)]
    metadata: Metadata,
}

/// Blob store backed by one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    name: String,
    dir: PathBuf,
}

impl FsBlobStore {
    /// Store `name` under `root`. The directory is created on first write.
    pub fn new(root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            dir: root.join(&name),
            name,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(key: &str) -> String {
        urlencoding::encode(key).replace('.', "%2E")
    }

    fn content_path(&self, key: &str) -> PathBuf {
        self.dir.join(Self::file_name(key))
    }

    fn sidecar_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", Self::file_name(key), SIDECAR_SUFFIX))
    }

    async fn read_sidecar(&self, key: &str) -> Result<Option<Sidecar>> {
        match fs::read(self.sidecar_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Blob>> {
        check_key(key)?;

        let data = match fs::read(self.content_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = self
            .read_sidecar(key)
            .await?
            .map(|sidecar| sidecar.metadata)
            .unwrap_or_default();

        Ok(Some(Blob { data, metadata }))
    }

    async fn set(&self, key: &str, data: Vec<u8>, metadata: Metadata) -> Result<WriteOutcome> {
        check_key(key)?;
        fs::create_dir_all(&self.dir).await?;

        let etag = etag(&data);
        let modified = self
            .read_sidecar(key)
            .await?
            .map_or(true, |previous| previous.etag != etag);

        fs::write(self.content_path(key), &data).await?;
        let sidecar = Sidecar {
            etag: etag.clone(),
            metadata,
        };
        fs::write(self.sidecar_path(key), serde_json::to_vec(&sidecar)?).await?;

        tracing::debug!(store = %self.name, key, modified, "blob written");
        Ok(WriteOutcome { modified, etag })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        remove_if_exists(&self.content_path(key)).await?;
        remove_if_exists(&self.sidecar_path(key)).await?;
        Ok(())
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<BlobEntry>> {
        let mut entries = Vec::new();

        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = dir.next_entry().await? {
            let file_name = entry.file_name();
            let Some(encoded) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(SIDECAR_SUFFIX))
            else {
                continue;
            };
            let Ok(key) = urlencoding::decode(encoded) else {
                tracing::warn!(store = %self.name, file = encoded, "skipping undecodable blob name");
                continue;
            };
            if prefix.is_some_and(|p| !key.starts_with(p)) {
                continue;
            }

            if let Some(sidecar) = self.read_sidecar(&key).await? {
                entries.push(BlobEntry {
                    key: key.into_owned(),
                    etag: sidecar.etag,
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}
