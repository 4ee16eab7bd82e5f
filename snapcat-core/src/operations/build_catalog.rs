use super::resolve_object::{ResolveObjectOperation, ResolveObjectOperationRequest};
use super::select_buckets::{SelectBucketsOperation, SelectBucketsOperationRequest, TagFilter};
use crate::catalog::{BucketListing, Catalog, CatalogEntry, CatalogHeader};
use crate::store::{SnapshotStore, timed};
use crate::timestamp::format_datetime;
use crate::{Result, SnapError};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_METADATA_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct BuildCatalogOperationRequest {
    pub filter: TagFilter,
    pub skip_unreadable_tags: bool,
    pub base_url: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BuildCatalogOperationResult {
    pub catalog: Catalog,
    pub degraded_entries: usize,
}

#[derive(Clone)]
pub struct BuildCatalogOperation {
    store: Arc<dyn SnapshotStore>,
    selector: SelectBucketsOperation,
    resolver: ResolveObjectOperation,
    call_timeout: Duration,
    metadata_concurrency: usize,
}

impl BuildCatalogOperation {
    pub fn new(store: Arc<dyn SnapshotStore>, call_timeout: Duration) -> Self {
        Self {
            selector: SelectBucketsOperation::new(store.clone(), call_timeout),
            resolver: ResolveObjectOperation::new(store.clone(), call_timeout),
            store,
            call_timeout,
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
        }
    }

    pub fn with_metadata_concurrency(mut self, metadata_concurrency: usize) -> Self {
        self.metadata_concurrency = metadata_concurrency.max(1);
        self
    }

    pub async fn run(
        &self,
        request: BuildCatalogOperationRequest,
    ) -> Result<BuildCatalogOperationResult> {
        let BuildCatalogOperationRequest {
            filter,
            skip_unreadable_tags,
            base_url,
            generated_at,
        } = request;

        let selection = self
            .selector
            .run(SelectBucketsOperationRequest {
                filter,
                skip_unreadable_tags,
            })
            .await?;

        let mut buckets = Vec::with_capacity(selection.buckets.len());
        let mut degraded_entries = 0usize;

        for bucket in selection.buckets {
            let listings = timed(
                "list_objects",
                self.call_timeout,
                self.store.list_objects(&bucket),
            )
            .await
            .map_err(|error| SnapError::ObjectList {
                bucket: bucket.clone(),
                reason: error.to_string(),
            })?;

            // `buffered` yields in input order, so ties keep listing order.
            let resolved: Vec<_> = stream::iter(listings)
                .map(|listing| {
                    self.resolver.run(ResolveObjectOperationRequest {
                        bucket: bucket.clone(),
                        listing,
                        base_url: base_url.clone(),
                    })
                })
                .buffered(self.metadata_concurrency)
                .collect()
                .await;

            let mut entries = Vec::with_capacity(resolved.len());
            for result in resolved {
                if result.degraded {
                    degraded_entries += 1;
                }
                entries.push(result.entry);
            }
            sort_newest_first(&mut entries);

            buckets.push(BucketListing { bucket, entries });
        }

        let catalog = Catalog {
            header: CatalogHeader {
                last_update: format_datetime(&generated_at),
            },
            buckets,
        };

        tracing::info!(
            "Built catalog: buckets={} entries={} degraded={}",
            catalog.buckets.len(),
            catalog.entry_count(),
            degraded_entries
        );

        Ok(BuildCatalogOperationResult {
            catalog,
            degraded_entries,
        })
    }
}

/// Stable sort by timestamp string, newest first.
fn sort_newest_first(entries: &mut [CatalogEntry]) {
    entries.sort_by(|left, right| right.last_modified.cmp(&left.last_modified));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySnapshotStore, ObjectListing, ObjectMetadata, StoreCall};
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn listing(key: &str, hour: u32) -> ObjectListing {
        ObjectListing {
            key: key.to_string(),
            size: 100,
            last_modified: at(hour),
        }
    }

    fn request() -> BuildCatalogOperationRequest {
        BuildCatalogOperationRequest {
            filter: TagFilter::new("public_snapshots", "true"),
            skip_unreadable_tags: false,
            base_url: "https://snapshots.example.com".to_string(),
            generated_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        }
    }

    fn operation(store: MemorySnapshotStore) -> BuildCatalogOperation {
        BuildCatalogOperation::new(Arc::new(store), Duration::from_secs(5))
    }

    fn names(catalog: &Catalog, bucket: &str) -> Vec<String> {
        catalog
            .bucket(bucket)
            .unwrap()
            .entries
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_entries_sorted_newest_first() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("obj0", 5))
            .object("hub", listing("obj1", 3))
            .object("hub", listing("obj2", 9));

        let result = assert_ok!(operation(store).run(request()).await);
        assert_eq!(names(&result.catalog, "hub"), vec!["obj2", "obj0", "obj1"]);
        assert_eq!(result.degraded_entries, 0);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_listing_order() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("first", 4))
            .object("hub", listing("newest", 6))
            .object("hub", listing("second", 4))
            .object("hub", listing("third", 4));

        let result = assert_ok!(operation(store).run(request()).await);
        assert_eq!(
            names(&result.catalog, "hub"),
            vec!["newest", "first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn test_block_time_drives_ordering() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("uploaded-late", 9))
            .object("hub", listing("uploaded-early", 1))
            .metadata(
                "hub",
                "uploaded-early",
                ObjectMetadata {
                    last_block_time: Some("2024-03-01T12:00:00Z".to_string()),
                    ..Default::default()
                },
            );

        let result = assert_ok!(operation(store).run(request()).await);
        assert_eq!(
            names(&result.catalog, "hub"),
            vec!["uploaded-early", "uploaded-late"]
        );
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_object() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("a", 1))
            .object("hub", listing("b", 2))
            .fail(StoreCall::StatObject("hub".to_string(), "a".to_string()));

        let result = assert_ok!(operation(store).run(request()).await);
        let listing = result.catalog.bucket("hub").unwrap();
        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].name, "b");
        assert!(listing.entries[0].enrichment.is_some());
        assert_eq!(listing.entries[1].name, "a");
        assert!(listing.entries[1].enrichment.is_none());
        assert_eq!(result.degraded_entries, 1);
    }

    #[tokio::test]
    async fn test_bucket_order_follows_selection() {
        let store = MemorySnapshotStore::new()
            .bucket("zzz", [("public_snapshots", "true")])
            .bucket("private", [("public_snapshots", "false")])
            .bucket("aaa", [("public_snapshots", "true")])
            .object("aaa", listing("x", 1));

        let result = assert_ok!(operation(store).run(request()).await);
        let order: Vec<&str> = result
            .catalog
            .buckets
            .iter()
            .map(|listing| listing.bucket.as_str())
            .collect();
        assert_eq!(order, vec!["zzz", "aaa"]);

        let json = assert_ok!(result.catalog.to_json());
        let result_pos = json.find(r#""result":"#).unwrap();
        let zzz_pos = json.find(r#""zzz":"#).unwrap();
        let aaa_pos = json.find(r#""aaa":"#).unwrap();
        assert!(result_pos < zzz_pos && zzz_pos < aaa_pos);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let result = assert_ok!(operation(MemorySnapshotStore::new()).run(request()).await);
        assert_eq!(
            assert_ok!(result.catalog.to_json()),
            r#"{"result":{"last_update":"2024-03-02T00:00:00.000000+00:00"}}"#
        );
    }

    #[tokio::test]
    async fn test_selector_failure_is_fatal() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("a", 1))
            .fail(StoreCall::ListBuckets);

        let error = assert_err!(operation(store).run(request()).await);
        assert!(matches!(error, SnapError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_object_list_failure_is_fatal() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .bucket("osmosis", [("public_snapshots", "true")])
            .object("hub", listing("a", 1))
            .fail(StoreCall::ListObjects("osmosis".to_string()));

        match assert_err!(operation(store).run(request()).await) {
            SnapError::ObjectList { bucket, .. } => assert_eq!(bucket, "osmosis"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_resolution_keeps_order() {
        let store = MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing("slow", 4))
            .object("hub", listing("fast", 4))
            .delay(
                StoreCall::StatObject("hub".to_string(), "slow".to_string()),
                Duration::from_millis(50),
            );

        let operation = operation(store).with_metadata_concurrency(4);
        let result = assert_ok!(operation.run(request()).await);
        assert_eq!(names(&result.catalog, "hub"), vec!["slow", "fast"]);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let operation = operation(MemorySnapshotStore::new()).with_metadata_concurrency(0);
        assert_eq!(operation.metadata_concurrency, 1);
    }
}
