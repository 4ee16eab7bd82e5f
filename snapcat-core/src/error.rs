use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store call '{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to fetch tags for bucket {bucket}: {reason}")]
    BucketTags { bucket: String, reason: String },

    #[error("Failed to list objects in bucket {bucket}: {reason}")]
    ObjectList { bucket: String, reason: String },

    #[error("Failed to fetch metadata for {bucket}/{key}: {reason}")]
    ObjectMetadata {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SnapError>;
