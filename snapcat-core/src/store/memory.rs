use super::{ObjectListing, ObjectMetadata, SnapshotStore};
use crate::{Result, SnapError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Identifies a single store call, for failure and delay injection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreCall {
    ListBuckets,
    BucketTags(String),
    ListObjects(String),
    StatObject(String, String),
}

#[derive(Debug, Clone, Default)]
struct MemoryBucket {
    name: String,
    tags: Option<HashMap<String, String>>,
    objects: Vec<ObjectListing>,
}

/// In-process store holding a fixed set of buckets.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    buckets: Vec<MemoryBucket>,
    metadata: HashMap<(String, String), ObjectMetadata>,
    failures: HashSet<StoreCall>,
    delays: HashMap<StoreCall, Duration>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket<I, K, V>(self, name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.push_bucket(name.into(), Some(tags))
    }

    /// Add a bucket that has no tag set at all.
    pub fn untagged_bucket(self, name: impl Into<String>) -> Self {
        self.push_bucket(name.into(), None)
    }

    fn push_bucket(mut self, name: String, tags: Option<HashMap<String, String>>) -> Self {
        self.buckets.push(MemoryBucket {
            name,
            tags,
            objects: Vec::new(),
        });
        self
    }

    /// Add an object to a bucket previously declared with [`Self::bucket`].
    pub fn object(mut self, bucket: &str, listing: ObjectListing) -> Self {
        if let Some(entry) = self.buckets.iter_mut().find(|entry| entry.name == bucket) {
            entry.objects.push(listing);
        }
        self
    }

    pub fn metadata(mut self, bucket: &str, key: &str, metadata: ObjectMetadata) -> Self {
        self.metadata
            .insert((bucket.to_string(), key.to_string()), metadata);
        self
    }

    pub fn fail(mut self, call: StoreCall) -> Self {
        self.failures.insert(call);
        self
    }

    pub fn delay(mut self, call: StoreCall, delay: Duration) -> Self {
        self.delays.insert(call, delay);
        self
    }

    async fn enter(&self, call: StoreCall) -> Result<()> {
        if let Some(delay) = self.delays.get(&call) {
            tokio::time::sleep(*delay).await;
        }

        if self.failures.contains(&call) {
            return Err(SnapError::Store(format!("injected failure: {:?}", call)));
        }

        Ok(())
    }

    fn find_bucket(&self, bucket: &str) -> Result<&MemoryBucket> {
        self.buckets
            .iter()
            .find(|entry| entry.name == bucket)
            .ok_or_else(|| SnapError::Store(format!("no such bucket: {}", bucket)))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.enter(StoreCall::ListBuckets).await?;
        Ok(self.buckets.iter().map(|entry| entry.name.clone()).collect())
    }

    async fn bucket_tags(&self, bucket: &str) -> Result<Option<HashMap<String, String>>> {
        self.enter(StoreCall::BucketTags(bucket.to_string())).await?;
        Ok(self.find_bucket(bucket)?.tags.clone())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectListing>> {
        self.enter(StoreCall::ListObjects(bucket.to_string())).await?;
        Ok(self.find_bucket(bucket)?.objects.clone())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        self.enter(StoreCall::StatObject(bucket.to_string(), key.to_string()))
            .await?;

        let bucket_entry = self.find_bucket(bucket)?;
        if !bucket_entry.objects.iter().any(|object| object.key == key) {
            return Err(SnapError::Store(format!("no such key: {}/{}", bucket, key)));
        }

        Ok(self
            .metadata
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
