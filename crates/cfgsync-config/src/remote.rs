use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::locator::RemoteDescriptor;
use cfgsync_core::{CfgError, Provider, Result};

/// Default per-request timeout for remote fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A remote key-value store that can hand back the raw bytes of one document.
#[async_trait]
pub trait RemoteProvider: Send + Sync {
    /// Human-readable name, e.g. "etcd".
    fn name(&self) -> &str;

    /// Fetch the raw document stored at `descriptor.path`.
    async fn fetch(&self, descriptor: &RemoteDescriptor) -> Result<Vec<u8>>;
}

/// Build the provider a descriptor names.
pub fn provider_for(descriptor: &RemoteDescriptor) -> Result<Arc<dyn RemoteProvider>> {
    match descriptor.provider {
        Provider::Etcd => Ok(Arc::new(EtcdProvider::new(DEFAULT_FETCH_TIMEOUT)?)),
    }
}

/// Reads single keys through the etcd v3 JSON gateway (`/v3/kv/range`).
pub struct EtcdProvider {
    client: reqwest::Client,
}

impl EtcdProvider {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CfgError::unreadable("etcd", format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RemoteProvider for EtcdProvider {
    fn name(&self) -> &str {
        "etcd"
    }

    async fn fetch(&self, descriptor: &RemoteDescriptor) -> Result<Vec<u8>> {
        let source_name = descriptor.to_string();
        let url = format!("{}/v3/kv/range", descriptor.endpoint.trim_end_matches('/'));
        let body = serde_json::json!({ "key": STANDARD.encode(descriptor.path.as_bytes()) });

        debug!(%url, key = %descriptor.path, "fetching remote config");
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CfgError::unreadable(&source_name, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CfgError::unreadable(
                &source_name,
                format!("HTTP {status}: {text}"),
            ));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| CfgError::unreadable(&source_name, e))?;
        decode_range_response(&source_name, &data)
    }
}

/// Extract the first kv's value from a `/v3/kv/range` response body.
pub fn decode_range_response(source_name: &str, data: &serde_json::Value) -> Result<Vec<u8>> {
    let encoded = data["kvs"]
        .as_array()
        .and_then(|kvs| kvs.first())
        .map(|kv| kv["value"].as_str().unwrap_or(""))
        .ok_or_else(|| CfgError::unreadable(source_name, "key not found"))?;
    STANDARD
        .decode(encoded)
        .map_err(|e| CfgError::unreadable(source_name, format!("invalid base64 value: {e}")))
}
