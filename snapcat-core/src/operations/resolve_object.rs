use crate::catalog::{CatalogEntry, Enrichment, public_object_url};
use crate::store::{ObjectListing, SnapshotStore, timed};
use crate::timestamp::{format_datetime, normalize_timestamp};
use crate::SnapError;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResolveObjectOperationRequest {
    pub bucket: String,
    pub listing: ObjectListing,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ResolveObjectOperationResult {
    pub entry: CatalogEntry,
    /// Metadata could not be fetched; the entry only has listing fields.
    pub degraded: bool,
}

/// Turns one listed object into a catalog entry.
///
/// Never fails: missing metadata keys default to empty strings, and a failed
/// metadata fetch degrades to an entry built from the listing alone.
#[derive(Clone)]
pub struct ResolveObjectOperation {
    store: Arc<dyn SnapshotStore>,
    call_timeout: Duration,
}

impl ResolveObjectOperation {
    pub fn new(store: Arc<dyn SnapshotStore>, call_timeout: Duration) -> Self {
        Self {
            store,
            call_timeout,
        }
    }

    pub async fn run(
        &self,
        request: ResolveObjectOperationRequest,
    ) -> ResolveObjectOperationResult {
        let ResolveObjectOperationRequest {
            bucket,
            listing,
            base_url,
        } = request;

        let url = public_object_url(&base_url, &bucket, &listing.key);
        let store_time = format_datetime(&listing.last_modified);

        let fetched = timed(
            "stat_object",
            self.call_timeout,
            self.store.stat_object(&bucket, &listing.key),
        )
        .await;

        let metadata = match fetched {
            Ok(metadata) => metadata,
            Err(error) => {
                let error = SnapError::ObjectMetadata {
                    bucket,
                    key: listing.key.clone(),
                    reason: error.to_string(),
                };
                tracing::warn!("{}; using listing attributes only", error);

                return ResolveObjectOperationResult {
                    entry: CatalogEntry {
                        name: listing.key,
                        url,
                        size: listing.size,
                        last_modified: store_time,
                        enrichment: None,
                    },
                    degraded: true,
                };
            }
        };

        // Chain-reported time wins over the store's last-modified.
        let last_modified = match metadata
            .last_block_time
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            Some(block_time) => normalize_timestamp(block_time),
            None => store_time,
        };

        ResolveObjectOperationResult {
            entry: CatalogEntry {
                name: listing.key,
                url,
                size: listing.size,
                last_modified,
                enrichment: Some(Enrichment {
                    app_hash: metadata.app_hash.unwrap_or_default(),
                    chain_id: metadata.chain_id.unwrap_or_default(),
                    last_block_height: metadata.last_block_height.unwrap_or_default(),
                }),
            },
            degraded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySnapshotStore, ObjectMetadata, StoreCall};
    use chrono::{TimeZone, Utc};

    const BASE_URL: &str = "https://snapshots.example.com";

    fn listing() -> ObjectListing {
        ObjectListing {
            key: "cosmoshub-4/snapshot.tar.lz4".to_string(),
            size: 1024,
            last_modified: Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap(),
        }
    }

    fn store() -> MemorySnapshotStore {
        MemorySnapshotStore::new()
            .bucket("hub", [("public_snapshots", "true")])
            .object("hub", listing())
    }

    async fn resolve(
        store: MemorySnapshotStore,
        call_timeout: Duration,
    ) -> ResolveObjectOperationResult {
        ResolveObjectOperation::new(Arc::new(store), call_timeout)
            .run(ResolveObjectOperationRequest {
                bucket: "hub".to_string(),
                listing: listing(),
                base_url: BASE_URL.to_string(),
            })
            .await
    }

    #[tokio::test]
    async fn test_block_time_overrides_store_time() {
        let store = store().metadata(
            "hub",
            "cosmoshub-4/snapshot.tar.lz4",
            ObjectMetadata {
                app_hash: Some("A1B2".to_string()),
                chain_id: Some("cosmoshub-4".to_string()),
                last_block_height: Some("19500000".to_string()),
                last_block_time: Some("2024-03-01T10:15:30.123456789Z".to_string()),
            },
        );

        let result = resolve(store, Duration::from_secs(5)).await;
        assert!(!result.degraded);
        assert_eq!(
            result.entry,
            CatalogEntry {
                name: "cosmoshub-4/snapshot.tar.lz4".to_string(),
                url: "https://snapshots.example.com/hub/cosmoshub-4/snapshot.tar.lz4".to_string(),
                size: 1024,
                last_modified: "2024-03-01T10:15:30.123456+00:00".to_string(),
                enrichment: Some(Enrichment {
                    app_hash: "A1B2".to_string(),
                    chain_id: "cosmoshub-4".to_string(),
                    last_block_height: "19500000".to_string(),
                }),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_block_time_falls_back_to_store_time() {
        let store = store().metadata(
            "hub",
            "cosmoshub-4/snapshot.tar.lz4",
            ObjectMetadata {
                chain_id: Some("cosmoshub-4".to_string()),
                last_block_time: Some(String::new()),
                ..Default::default()
            },
        );

        let result = resolve(store, Duration::from_secs(5)).await;
        assert!(!result.degraded);
        assert_eq!(result.entry.last_modified, "2024-02-01T08:00:00.000000+00:00");

        let enrichment = result.entry.enrichment.unwrap();
        assert_eq!(enrichment.chain_id, "cosmoshub-4");
        assert_eq!(enrichment.app_hash, "");
        assert_eq!(enrichment.last_block_height, "");
    }

    #[tokio::test]
    async fn test_malformed_block_time_is_kept_verbatim() {
        let store = store().metadata(
            "hub",
            "cosmoshub-4/snapshot.tar.lz4",
            ObjectMetadata {
                last_block_time: Some("yesterday".to_string()),
                ..Default::default()
            },
        );

        let result = resolve(store, Duration::from_secs(5)).await;
        assert_eq!(result.entry.last_modified, "yesterday");
    }

    #[tokio::test]
    async fn test_stat_failure_degrades_to_baseline() {
        let store = store().fail(StoreCall::StatObject(
            "hub".to_string(),
            "cosmoshub-4/snapshot.tar.lz4".to_string(),
        ));

        let result = resolve(store, Duration::from_secs(5)).await;
        assert!(result.degraded);
        assert!(result.entry.enrichment.is_none());
        assert_eq!(result.entry.last_modified, "2024-02-01T08:00:00.000000+00:00");
        assert_eq!(result.entry.size, 1024);
    }

    #[tokio::test]
    async fn test_stat_timeout_degrades_to_baseline() {
        let store = store().delay(
            StoreCall::StatObject(
                "hub".to_string(),
                "cosmoshub-4/snapshot.tar.lz4".to_string(),
            ),
            Duration::from_secs(5),
        );

        let result = resolve(store, Duration::from_millis(20)).await;
        assert!(result.degraded);
        assert!(result.entry.enrichment.is_none());
    }
}
