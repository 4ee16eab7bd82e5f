//! Snapcat Core - public catalog of chain snapshots kept in S3-compatible storage
//!
//! Builds a per-request catalog of snapshot objects:
//! - buckets are selected by an exact tag match
//! - each object is enriched with chain metadata from its custom headers
//! - timestamps are rendered in one canonical UTC form
//! - each bucket's entries are ordered newest first

pub mod catalog;
pub mod error;
pub mod operations;
pub mod store;
pub mod timestamp;

pub use catalog::{
    BucketListing, Catalog, CatalogEntry, CatalogHeader, Enrichment, public_object_url,
};
pub use error::{Result, SnapError};
pub use operations::{
    BuildCatalogOperation, BuildCatalogOperationRequest, BuildCatalogOperationResult,
    DEFAULT_METADATA_CONCURRENCY, ResolveObjectOperation, ResolveObjectOperationRequest,
    ResolveObjectOperationResult, SelectBucketsOperation, SelectBucketsOperationRequest,
    SelectBucketsOperationResult, TagFilter,
};
pub use store::{
    MemorySnapshotStore, ObjectListing, ObjectMetadata, S3SnapshotStore, SnapshotStore,
    StoreBuilder, StoreCall,
};
pub use timestamp::{Normalized, format_datetime, normalize_timestamp, parse_timestamp};
