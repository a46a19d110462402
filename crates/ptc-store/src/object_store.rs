//! Permanent-addressing side of the dual-write Content Store.
//!
//! Three tiers, selected by [`ptc_core::config::ObjectStoreConfig`]:
//!   1. [`LocalDaemonBackend`] — a local content-addressed daemon (e.g. an
//!      `ipfs daemon`) reachable over its HTTP API.
//!   2. [`PinningServiceBackend`] — a remote pinning service reachable only
//!      through its gateway, for deployments with no local daemon.
//!   3. [`HashOnlyBackend`] — always degrades gracefully: the hash computed
//!      by [`crate::hash::content_hash`] is still the permanent identifier,
//!      it is simply never replicated anywhere.

use async_trait::async_trait;
use ptc_core::config::ObjectStoreConfig;

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// True if the backend is configured and currently reachable.
    async fn available(&self) -> bool;

    /// Add content, returning its backend-assigned identifier (e.g. a CID).
    /// `None` means the add could not complete — callers must not treat
    /// this as fatal, the hash already computed remains valid.
    async fn add(&self, content: &[u8]) -> Option<String>;

    /// Retrieve previously added content by identifier.
    async fn get(&self, cid: &str) -> Option<Vec<u8>>;

    /// Pin an identifier so the backend retains it indefinitely.
    async fn pin(&self, cid: &str) -> bool;
}

pub struct HashOnlyBackend;

#[async_trait]
impl ObjectBackend for HashOnlyBackend {
    async fn available(&self) -> bool {
        false
    }
    async fn add(&self, _content: &[u8]) -> Option<String> {
        None
    }
    async fn get(&self, _cid: &str) -> Option<Vec<u8>> {
        None
    }
    async fn pin(&self, _cid: &str) -> bool {
        false
    }
}

pub struct LocalDaemonBackend {
    client: reqwest::Client,
    api: String,
    gateway: String,
}

impl LocalDaemonBackend {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api: config.api.clone(),
            gateway: config.gateway.clone(),
        }
    }
}

#[async_trait]
impl ObjectBackend for LocalDaemonBackend {
    async fn available(&self) -> bool {
        let url = format!("{}/api/v0/id", self.api);
        self.client
            .post(&url)
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    async fn add(&self, content: &[u8]) -> Option<String> {
        let url = format!("{}/api/v0/add?pin=true", self.api);
        let part = reqwest::multipart::Part::bytes(content.to_vec()).file_name("artifact");
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .client
            .post(&url)
            .timeout(std::time::Duration::from_secs(30))
            .multipart(form)
            .send()
            .await
            .ok()?;
        let body: serde_json::Value = resp.json().await.ok()?;
        body.get("Hash")?.as_str().map(str::to_string)
    }

    async fn get(&self, cid: &str) -> Option<Vec<u8>> {
        let url = format!("{}/ipfs/{}", self.gateway, cid);
        let resp = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .ok()?;
        resp.bytes().await.ok().map(|b| b.to_vec())
    }

    async fn pin(&self, cid: &str) -> bool {
        let url = format!("{}/api/v0/pin/add?arg={}", self.api, cid);
        self.client
            .post(&url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}

pub struct PinningServiceBackend {
    client: reqwest::Client,
    gateway: String,
    token: Option<String>,
}

impl PinningServiceBackend {
    pub fn new(config: &ObjectStoreConfig, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway: config.gateway.clone(),
            token,
        }
    }
}

#[async_trait]
impl ObjectBackend for PinningServiceBackend {
    async fn available(&self) -> bool {
        self.token.is_some()
    }

    async fn add(&self, _content: &[u8]) -> Option<String> {
        // Remote pinning services pin by hash of content already known to
        // the gateway; this workspace does not ship a default provider
        // integration, so add is a no-op until a concrete provider is
        // configured. available() reports false without a token, steering
        // dual_store() toward hash-only mode.
        None
    }

    async fn get(&self, cid: &str) -> Option<Vec<u8>> {
        let url = format!("{}/ipfs/{}", self.gateway, cid);
        let resp = self.client.get(&url).send().await.ok()?;
        resp.bytes().await.ok().map(|b| b.to_vec())
    }

    async fn pin(&self, cid: &str) -> bool {
        let token = match &self.token {
            Some(t) => t,
            None => return false,
        };
        let resp = self
            .client
            .post(format!("{}/pinning/pinByHash", self.gateway))
            .bearer_auth(token)
            .json(&serde_json::json!({"hashToPin": cid}))
            .send()
            .await;
        resp.map(|r| r.status().is_success()).unwrap_or(false)
    }
}

/// Builds the backend named by `config.enabled`/`config.pin_service`.
pub fn backend_for(config: &ObjectStoreConfig, pinata_jwt: Option<String>) -> Box<dyn ObjectBackend> {
    if !config.enabled {
        return Box::new(HashOnlyBackend);
    }
    match config.pin_service.as_str() {
        "pinata" => Box::new(PinningServiceBackend::new(config, pinata_jwt)),
        _ => Box::new(LocalDaemonBackend::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_only_backend_always_degrades() {
        let backend = HashOnlyBackend;
        assert!(!backend.available().await);
        assert_eq!(backend.add(b"content").await, None);
        assert!(!backend.pin("Qm1").await);
    }

    #[test]
    fn backend_for_disabled_config_is_hash_only() {
        let config = ObjectStoreConfig { enabled: false, ..ObjectStoreConfig::default() };
        let backend = backend_for(&config, None);
        assert!(futures::executor::block_on(backend.add(b"x")).is_none());
    }
}
