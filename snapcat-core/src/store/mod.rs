//! Store modules for Snapcat
//!
//! Provides the read-only object store interface used by the catalog
//! operations, with an S3 backend and an in-memory backend.

pub mod factory;
pub mod memory;
pub mod s3;

pub use factory::StoreBuilder;
pub use memory::{MemorySnapshotStore, StoreCall};
pub use s3::S3SnapshotStore;

use crate::{Result, SnapError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// One entry of a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectListing {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Chain metadata stored as custom headers on a snapshot object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub app_hash: Option<String>,
    pub chain_id: Option<String>,
    pub last_block_height: Option<String>,
    pub last_block_time: Option<String>,
}

impl ObjectMetadata {
    /// Pick the known keys out of raw user metadata.
    ///
    /// Keys match case-insensitively, `-` and `_` are interchangeable and an
    /// `x-amz-meta-` prefix is ignored. Unknown keys are dropped.
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut metadata = Self::default();
        for (key, value) in headers {
            let key = canonical_header_key(key);
            let slot = match key.as_str() {
                "app_hash" => &mut metadata.app_hash,
                "chain_id" => &mut metadata.chain_id,
                "last_block_height" => &mut metadata.last_block_height,
                "last_block_time" => &mut metadata.last_block_time,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        metadata
    }
}

fn canonical_header_key(key: &str) -> String {
    let lowered = key.trim().to_ascii_lowercase().replace('-', "_");
    match lowered.strip_prefix("x_amz_meta_") {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

/// Read-only view of an S3-compatible object store.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Names of every bucket, in store enumeration order.
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Tag set of a bucket. `None` when the bucket carries no tags.
    async fn bucket_tags(&self, bucket: &str) -> Result<Option<HashMap<String, String>>>;

    /// Every object of a bucket, in store enumeration order.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectListing>>;

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata>;
}

/// Run a store call with a deadline.
pub async fn timed<T, F>(operation: &str, after: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(SnapError::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}
