//! HTTP and filesystem implementations of the engine's collaborators.

use std::path::PathBuf;

use bytes::Bytes;
use reqwest::Client;
use streaming::{
    AssetFetcher, AssetLoadError, BoxFuture, ConfigError, ConfigSource, LoadJob, WorldConfig,
};

/// Fetches tile assets from `{base}/tiles/{layer}/{asset}`.
///
/// The response body is the asset handle. Format fallback (webp/png) is the
/// server's business.
pub struct HttpAssetFetcher {
    base_url: String,
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base(base_url.into()),
            client: Client::new(),
        }
    }

    pub fn asset_url(&self, job: &LoadJob) -> String {
        format!("{}/tiles/{}/{}", self.base_url, job.layer_id, job.asset_key)
    }
}

impl AssetFetcher for HttpAssetFetcher {
    type Asset = Bytes;

    fn fetch(&self, job: &LoadJob) -> BoxFuture<'_, Result<Bytes, AssetLoadError>> {
        let url = self.asset_url(job);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AssetLoadError::new(format!("GET {url}: {e}")))?;

            if !resp.status().is_success() {
                return Err(AssetLoadError::new(format!("GET {url}: HTTP {}", resp.status())));
            }

            let body = resp
                .bytes()
                .await
                .map_err(|e| AssetLoadError::new(format!("GET {url}: {e}")))?;
            if body.is_empty() {
                return Err(AssetLoadError::new(format!("GET {url}: empty body")));
            }
            Ok(body)
        })
    }
}

/// Reads the world configuration from `{base}/api/maps`.
pub struct HttpConfigSource {
    base_url: String,
    client: Client,
}

impl HttpConfigSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_base(base_url.into()),
            client: Client::new(),
        }
    }
}

impl ConfigSource for HttpConfigSource {
    fn fetch_world_config(&self) -> BoxFuture<'_, Result<WorldConfig, ConfigError>> {
        let url = format!("{}/api/maps", self.base_url);
        Box::pin(async move {
            let resp = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| ConfigError::Unavailable(format!("GET {url}: {e}")))?;
            if !resp.status().is_success() {
                return Err(ConfigError::Unavailable(format!(
                    "GET {url}: HTTP {}",
                    resp.status()
                )));
            }
            let body = resp
                .bytes()
                .await
                .map_err(|e| ConfigError::Unavailable(format!("GET {url}: {e}")))?;
            WorldConfig::from_slice(&body)
        })
    }
}

/// Reads the world configuration from a local JSON file.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn fetch_world_config(&self) -> BoxFuture<'_, Result<WorldConfig, ConfigError>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                ConfigError::Unavailable(format!("read {}: {e}", self.path.display()))
            })?;
            WorldConfig::from_slice(&bytes)
        })
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
