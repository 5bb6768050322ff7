//! Blob service - typed access to the four application stores
//!
//! - `user-data`: user preferences under `preferences:<user id>`
//! - `api-cache`: API responses wrapped in a TTL envelope
//! - `file-uploads`: raw file content with upload metadata
//! - `build-data`: JSON written at build/deploy time

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::fs::FsBlobStore;
use crate::memory::MemoryBlobStore;
use crate::store::{get_json, set_json, BlobEntry, BlobStore, Metadata, WriteOutcome};

pub const USER_STORE: &str = "user-data";
pub const CACHE_STORE: &str = "api-cache";
pub const FILES_STORE: &str = "file-uploads";
pub const BUILD_STORE: &str = "build-data";

pub const STORE_NAMES: [&str; 4] = [USER_STORE, CACHE_STORE, FILES_STORE, BUILD_STORE];

/// Default lifetime of a cached API response
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    Compact,
    Comfortable,
}

/// Per-user UI preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: String,
    pub layout_mode: LayoutMode,
    pub notifications: bool,
    /// Epoch milliseconds
    pub last_updated: i64,
}

/// Cached value with its write time and lifetime, both in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub ttl: i64,
    pub key: String,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > self.ttl
    }
}

/// Upload metadata supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_by: String,
    pub uploaded_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Upload metadata as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileMetadata {
    #[serde(flatten)]
    pub file: FileMetadata,
    #[serde(rename = "type")]
    pub kind: String,
    pub stored_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub data: Vec<u8>,
    pub metadata: StoredFileMetadata,
}

fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        _ => Metadata::new(),
    }
}

fn preferences_key(user_id: &str) -> String {
    format!("preferences:{}", user_id)
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

pub struct BlobService {
    user: Box<dyn BlobStore>,
    cache: Box<dyn BlobStore>,
    files: Box<dyn BlobStore>,
    build: Box<dyn BlobStore>,
}

impl BlobService {
    pub fn new(
        user: Box<dyn BlobStore>,
        cache: Box<dyn BlobStore>,
        files: Box<dyn BlobStore>,
        build: Box<dyn BlobStore>,
    ) -> Self {
        Self {
            user,
            cache,
            files,
            build,
        }
    }

    /// One directory per store under `root`.
    pub fn on_disk(root: &Path) -> Self {
        Self::new(
            Box::new(FsBlobStore::new(root, USER_STORE)),
            Box::new(FsBlobStore::new(root, CACHE_STORE)),
            Box::new(FsBlobStore::new(root, FILES_STORE)),
            Box::new(FsBlobStore::new(root, BUILD_STORE)),
        )
    }

    pub fn in_memory() -> Self {
        Self::new(
            Box::new(MemoryBlobStore::new(USER_STORE)),
            Box::new(MemoryBlobStore::new(CACHE_STORE)),
            Box::new(MemoryBlobStore::new(FILES_STORE)),
            Box::new(MemoryBlobStore::new(BUILD_STORE)),
        )
    }

    /// Look a store up by name.
    pub fn store(&self, name: &str) -> Option<&dyn BlobStore> {
        [&self.user, &self.cache, &self.files, &self.build]
            .into_iter()
            .find(|store| store.name() == name)
            .map(|store| store.as_ref())
    }

    // Preferences

    pub async fn save_user_preferences(
        &self,
        user_id: &str,
        preferences: &UserPreferences,
    ) -> Result<WriteOutcome> {
        let meta = metadata(json!({
            "updatedAt": Utc::now().timestamp_millis(),
            "version": "1.0",
            "type": "user-preferences",
        }));
        set_json(self.user.as_ref(), &preferences_key(user_id), preferences, meta).await
    }

    pub async fn get_user_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        get_json(self.user.as_ref(), &preferences_key(user_id)).await
    }

    pub async fn delete_user_preferences(&self, user_id: &str) -> Result<()> {
        self.user.delete(&preferences_key(user_id)).await
    }

    // API cache

    /// Cache `data` under `key` for `ttl`.
    pub async fn cache_api_response<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
    ) -> Result<WriteOutcome> {
        self.cache_at(key, data, ttl, Utc::now()).await
    }

    async fn cache_at<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let timestamp = now.timestamp_millis();
        let ttl_ms = millis(ttl);
        let entry = CacheEntry {
            data,
            timestamp,
            ttl: ttl_ms,
            key: key.to_owned(),
        };
        let meta = metadata(json!({
            "expiresAt": timestamp.saturating_add(ttl_ms),
            "type": "api-cache",
            "ttl": ttl.as_secs() / 60,
        }));
        set_json(self.cache.as_ref(), key, &entry, meta).await
    }

    /// Cached data, or `None` when absent or expired. Expired entries are removed.
    pub async fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.cached_at(key, Utc::now()).await
    }

    async fn cached_at<T: DeserializeOwned>(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<T>> {
        let Some(entry) = get_json::<CacheEntry<T>>(self.cache.as_ref(), key).await? else {
            return Ok(None);
        };

        if entry.is_expired(now.timestamp_millis()) {
            tracing::debug!(key, "cache entry expired");
            self.cache.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(entry.data))
    }

    pub async fn clear_cache(&self, key: &str) -> Result<()> {
        self.cache.delete(key).await
    }

    // Files

    pub async fn store_file(
        &self,
        file_id: &str,
        data: Vec<u8>,
        file: &FileMetadata,
    ) -> Result<WriteOutcome> {
        let stored = StoredFileMetadata {
            file: file.clone(),
            kind: "file-upload".to_owned(),
            stored_at: Utc::now().timestamp_millis(),
        };
        let meta = metadata(serde_json::to_value(&stored)?);
        self.files.set(file_id, data, meta).await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<Option<StoredFile>> {
        let Some(blob) = self.files.get(file_id).await? else {
            return Ok(None);
        };
        let metadata = serde_json::from_value(Value::Object(blob.metadata))?;
        Ok(Some(StoredFile {
            data: blob.data,
            metadata,
        }))
    }

    pub async fn list_files(&self, prefix: Option<&str>) -> Result<Vec<BlobEntry>> {
        self.files.list(prefix).await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.files.delete(file_id).await
    }

    // Build data

    pub async fn store_build_data(&self, key: &str, data: &Value) -> Result<WriteOutcome> {
        let meta = metadata(json!({
            "createdAt": Utc::now().timestamp_millis(),
            "type": "build-data",
        }));
        set_json(self.build.as_ref(), key, data, meta).await
    }

    pub async fn get_build_data(&self, key: &str) -> Result<Option<Value>> {
        get_json(self.build.as_ref(), key).await
    }
}
