use crate::store::{SnapshotStore, timed};
use crate::{Result, SnapError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Exact, case-sensitive match of one bucket tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    pub name: String,
    pub value: String,
}

impl TagFilter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, tags: Option<&HashMap<String, String>>) -> bool {
        tags.and_then(|tags| tags.get(&self.name))
            .is_some_and(|value| *value == self.value)
    }
}

#[derive(Debug, Clone)]
pub struct SelectBucketsOperationRequest {
    pub filter: TagFilter,
    /// Exclude buckets whose tags cannot be read instead of failing.
    pub skip_unreadable_tags: bool,
}

#[derive(Debug, Clone)]
pub struct SelectBucketsOperationResult {
    pub buckets: Vec<String>,
}

#[derive(Clone)]
pub struct SelectBucketsOperation {
    store: Arc<dyn SnapshotStore>,
    call_timeout: Duration,
}

impl SelectBucketsOperation {
    pub fn new(store: Arc<dyn SnapshotStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    pub async fn run(
        &self,
        request: SelectBucketsOperationRequest,
    ) -> Result<SelectBucketsOperationResult> {
        let SelectBucketsOperationRequest {
            filter,
            skip_unreadable_tags,
        } = request;

        let names = timed("list_buckets", self.call_timeout, self.store.list_buckets())
            .await
            .map_err(|error| SnapError::StoreUnavailable(error.to_string()))?;

        let mut buckets = Vec::new();
        for bucket in names {
            let tags = match timed(
                "bucket_tags",
                self.call_timeout,
                self.store.bucket_tags(&bucket),
            )
            .await
            {
                Ok(tags) => tags,
                Err(error) if skip_unreadable_tags => {
                    tracing::warn!(
                        "Skipping bucket with unreadable tags. bucket={} error={}",
                        bucket,
                        error
                    );
                    continue;
                }
                Err(error) => {
                    return Err(SnapError::BucketTags {
                        bucket,
                        reason: error.to_string(),
                    });
                }
            };

            if filter.matches(tags.as_ref()) {
                tracing::debug!("Selected bucket {}", bucket);
                buckets.push(bucket);
            } else {
                tracing::debug!(
                    "Bucket {} does not carry {}={}",
                    bucket,
                    filter.name,
                    filter.value
                );
            }
        }

        Ok(SelectBucketsOperationResult { buckets })
    }
}
