use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snapcat_core::{
    BuildCatalogOperationRequest, DEFAULT_METADATA_CONCURRENCY, Result, SnapError, StoreBuilder,
    TagFilter,
};
use std::collections::HashMap;
use std::time::Duration;

/// Unprefixed variables understood for compatibility with older deployments.
const LEGACY_ENV_OVERRIDES: [(&str, &str); 3] = [
    ("SERVER_URL", "store.endpoint"),
    ("ACCESS_KEY", "store.access_key"),
    ("SECRET_KEY", "store.secret_key"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    /// Base of the public object URLs. Derived from the store endpoint when unset.
    pub public_base_url: Option<String>,
    pub store: StoreConfig,
    pub selector: SelectorConfig,
    pub catalog: CatalogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: None,
            store: StoreConfig::default(),
            selector: SelectorConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub secure: bool,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            region: "us-east-1".to_string(),
            secure: true,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub tag_name: String,
    pub tag_value: String,
    pub skip_unreadable_tags: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            tag_name: "public_snapshots".to_string(),
            tag_value: "true".to_string(),
            skip_unreadable_tags: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub metadata_concurrency: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            metadata_concurrency: DEFAULT_METADATA_CONCURRENCY,
        }
    }
}

impl Config {
    /// Load from an optional file plus the process environment.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::from_sources(path, None)
    }

    /// Load from an optional file plus `env`, or the process environment when `env` is `None`.
    pub fn from_sources(path: &str, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("SNAPCAT")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env.clone()),
            );

        for (variable, key) in LEGACY_ENV_OVERRIDES {
            let value = match &env {
                Some(map) => map.get(variable).cloned(),
                None => std::env::var(variable).ok(),
            };
            builder = builder
                .set_override_option(key, value.filter(|value| !value.trim().is_empty()))
                .map_err(|e| SnapError::Config(e.to_string()))?;
        }

        let settings = builder
            .build()
            .map_err(|e| SnapError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SnapError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.timeout_secs == 0 {
            return Err(SnapError::Config(
                "store.timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.selector.tag_name.trim().is_empty() {
            return Err(SnapError::Config(
                "selector.tag_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    pub fn store_builder(&self) -> StoreBuilder {
        StoreBuilder::new()
            .endpoint(self.store.endpoint.clone())
            .region(self.store.region.clone())
            .credentials(self.store.access_key.clone(), self.store.secret_key.clone())
            .secure(self.store.secure)
    }

    /// Configured public base URL, or `https://<endpoint host>`.
    pub fn public_base_url(&self) -> String {
        if let Some(base) = self
            .public_base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            return base.trim_end_matches('/').to_string();
        }

        let endpoint = self.store.endpoint.trim();
        let host = endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(endpoint)
            .trim_end_matches('/');
        format!("https://{}", host)
    }

    pub fn catalog_request(&self, generated_at: DateTime<Utc>) -> BuildCatalogOperationRequest {
        BuildCatalogOperationRequest {
            filter: TagFilter::new(
                self.selector.tag_name.clone(),
                self.selector.tag_value.clone(),
            ),
            skip_unreadable_tags: self.selector.skip_unreadable_tags,
            base_url: self.public_base_url(),
            generated_at,
        }
    }
}
