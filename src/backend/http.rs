//! HTTP client for the proxy's admin configuration API.

use super::{BackendError, ConfigBackend};
use crate::document::{ConfigDocument, Patch, SectionKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Connection settings for the HTTP backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Base URL of the admin API (e.g. "http://127.0.0.1:8081/api/").
    pub base_url: String,

    /// API key sent as a Bearer token.
    pub api_key: String,

    /// Request timeout in seconds, applied to load and update alike.
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081/api/".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Configuration backend speaking JSON to the admin API.
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
    api_key: String,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Result<Self, BackendError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|e| BackendError::Format(format!("invalid base url: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base,
            api_key: settings.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|e| BackendError::Format(format!("invalid endpoint path: {e}")))
    }
}

#[async_trait]
impl ConfigBackend for HttpBackend {
    async fn fetch(&self) -> Result<ConfigDocument, BackendError> {
        let url = self.endpoint("configs")?;
        tracing::debug!(%url, "fetching configuration document");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn persist(&self, key: &SectionKey, patch: &Patch) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("configs/{}/{}", key.namespace(), key.section()))?;
        tracing::debug!(section = %key, fields = patch.len(), "persisting patch");
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.api_key)
            .json(patch)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            Err(BackendError::Rejected { status, message })
        }
    }
}
