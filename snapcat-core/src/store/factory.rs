use super::{S3SnapshotStore, SnapshotStore};
use crate::{Result, SnapError};
use std::sync::Arc;

const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    endpoint: Option<String>,
    region: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    secure: Option<bool>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoint URL, or a bare `host[:port]` as accepted by MinIO clients.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Scheme used when the endpoint has none. Defaults to https.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn resolve_endpoint(&self) -> Result<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/');

        if endpoint.is_empty() {
            return Err(SnapError::Config(
                "store endpoint cannot be empty".to_string(),
            ));
        }

        if endpoint.contains("://") {
            return Ok(endpoint.to_string());
        }

        let scheme = if self.secure.unwrap_or(true) {
            "https"
        } else {
            "http"
        };
        Ok(format!("{}://{}", scheme, endpoint))
    }

    fn resolve_region(&self) -> String {
        self.region
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_REGION)
            .to_string()
    }

    fn resolve_credentials(&self) -> Result<(String, String)> {
        let access_key = self.access_key.as_deref().unwrap_or_default().trim();
        let secret_key = self.secret_key.as_deref().unwrap_or_default().trim();

        if access_key.is_empty() || secret_key.is_empty() {
            return Err(SnapError::Config(
                "store access key and secret key are required".to_string(),
            ));
        }

        Ok((access_key.to_string(), secret_key.to_string()))
    }

    pub async fn build(&self) -> Result<Arc<dyn SnapshotStore>> {
        let endpoint = self.resolve_endpoint()?;
        let region = self.resolve_region();
        let (access_key, secret_key) = self.resolve_credentials()?;

        tracing::info!("Connecting to object store {} (region {})", endpoint, region);

        let store = S3SnapshotStore::new(&endpoint, &region, &access_key, &secret_key).await?;
        Ok(Arc::new(store))
    }
}
