//! tablegate-blobs: key/value blob storage with metadata
//!
//! A [`BlobStore`] trait with filesystem and in-memory implementations, and
//! [`BlobService`] for the application's stores.

pub mod error;
pub mod fs;
pub mod keys;
pub mod memory;
pub mod service;
pub mod store;

pub use error::{BlobError, Result};
pub use fs::FsBlobStore;
pub use keys::{generate_cache_key, should_cache};
pub use memory::MemoryBlobStore;
pub use service::{
    BlobService, CacheEntry, FileMetadata, LayoutMode, StoredFile, StoredFileMetadata, Theme,
    UserPreferences, DEFAULT_CACHE_TTL, STORE_NAMES,
};
pub use store::{etag, Blob, BlobEntry, BlobStore, Metadata, WriteOutcome};
