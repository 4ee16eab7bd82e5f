use super::{ObjectListing, ObjectMetadata, SnapshotStore};
use crate::{Result, SnapError};
use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const NO_TAG_SET: &str = "NoSuchTagSet";

/// [`SnapshotStore`] backed by an S3-compatible endpoint.
#[derive(Clone)]
pub struct S3SnapshotStore {
    client: aws_sdk_s3::Client,
}

impl S3SnapshotStore {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            access_key,
            secret_key,
            None,
            None,
            "snapcat-static",
        );

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(s3_config)))
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|error| SnapError::Store(format!("ListBuckets failed: {}", error)))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|bucket| bucket.name().map(str::to_string))
            .collect())
    }

    async fn bucket_tags(&self, bucket: &str) -> Result<Option<HashMap<String, String>>> {
        let output = match self.client.get_bucket_tagging().bucket(bucket).send().await {
            Ok(output) => output,
            Err(error) => {
                if error.as_service_error().and_then(|service| service.code()) == Some(NO_TAG_SET) {
                    return Ok(None);
                }
                return Err(SnapError::Store(format!(
                    "GetBucketTagging failed: bucket={} error={}",
                    bucket, error
                )));
            }
        };

        let tags = output
            .tag_set()
            .iter()
            .map(|tag| (tag.key().to_string(), tag.value().to_string()))
            .collect();

        Ok(Some(tags))
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectListing>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|error| {
                SnapError::Store(format!(
                    "ListObjectsV2 failed: bucket={} error={}",
                    bucket, error
                ))
            })?;

            for object in page.contents() {
                let Some(key) = object.key() else {
                    continue;
                };

                let last_modified = object
                    .last_modified()
                    .and_then(|value| {
                        DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
                    })
                    .unwrap_or_default();

                objects.push(ObjectListing {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                    last_modified,
                });
            }
        }

        Ok(objects)
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                SnapError::Store(format!(
                    "HeadObject failed: bucket={} key={} error={}",
                    bucket, key, error
                ))
            })?;

        let metadata = match output.metadata() {
            Some(headers) => ObjectMetadata::from_headers(
                headers
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            ),
            None => ObjectMetadata::default(),
        };

        Ok(metadata)
    }
}
