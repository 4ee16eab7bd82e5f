//! Catalog document types.
//!
//! The serialized document always starts with the `result` header, followed
//! by one key per selected bucket in selection order.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Chain fields carried from object headers into a catalog entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub app_hash: String,
    pub chain_id: String,
    pub last_block_height: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
    pub size: u64,
    pub last_modified: String,
    /// `None` when metadata could not be fetched; the fields are then
    /// omitted from the output instead of being emitted empty.
    #[serde(flatten)]
    pub enrichment: Option<Enrichment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogHeader {
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketListing {
    pub bucket: String,
    pub entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub header: CatalogHeader,
    pub buckets: Vec<BucketListing>,
}

impl Catalog {
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(|listing| listing.entries.len()).sum()
    }

    pub fn bucket(&self, name: &str) -> Option<&BucketListing> {
        self.buckets.iter().find(|listing| listing.bucket == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for Catalog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.buckets.len() + 1))?;
        map.serialize_entry("result", &self.header)?;
        for listing in &self.buckets {
            map.serialize_entry(&listing.bucket, &listing.entries)?;
        }
        map.end()
    }
}

/// Public download URL of an object: `<base>/<bucket>/<key>`.
pub fn public_object_url(base_url: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, key)
}
