pub mod build_catalog;
pub mod resolve_object;
pub mod select_buckets;

pub use build_catalog::{
    BuildCatalogOperation, BuildCatalogOperationRequest, BuildCatalogOperationResult,
    DEFAULT_METADATA_CONCURRENCY,
};
pub use resolve_object::{
    ResolveObjectOperation, ResolveObjectOperationRequest, ResolveObjectOperationResult,
};
pub use select_buckets::{
    SelectBucketsOperation, SelectBucketsOperationRequest, SelectBucketsOperationResult,
    TagFilter,
};
