//! Embedding generation backends.
//!
//! The original implementation lazy-loads a local `sentence-transformers`
//! model when `api == "local"`. Nothing in this workspace's dependency
//! stack runs an ML model in-process, so the "local" tier here means a
//! local embedding server reachable over HTTP (the original's own comment
//! notes "API backends can be added later") — [`RemoteApiBackend`] covers
//! both that and a hosted embedding API. [`DisabledBackend`] is the
//! graceful-degradation path used whenever embeddings are turned off.

use async_trait::async_trait;
use ptc_core::config::EmbeddingConfig;

#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn available(&self) -> bool;

    /// Embed `text` (callers truncate to the original's ~2000 char budget
    /// before calling). `None` means embeddings could not be produced —
    /// never a hard error, callers fall back to text search.
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

pub struct DisabledBackend;

#[async_trait]
impl EmbeddingBackend for DisabledBackend {
    async fn available(&self) -> bool {
        false
    }
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

pub struct RemoteApiBackend {
    client: reqwest::Client,
    endpoint: String,
    dim: usize,
}

impl RemoteApiBackend {
    pub fn new(endpoint: impl Into<String>, dim: usize) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.into(), dim }
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteApiBackend {
    async fn available(&self) -> bool {
        self.client
            .head(&self.endpoint)
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        #[derive(serde::Deserialize)]
        struct EmbedResponse {
            embedding: Vec<f32>,
        }
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(std::time::Duration::from_secs(15))
            .json(&serde_json::json!({"text": text}))
            .send()
            .await
            .ok()?;
        let parsed: EmbedResponse = resp.json().await.ok()?;
        if parsed.embedding.len() != self.dim {
            tracing::warn!(
                expected = self.dim,
                got = parsed.embedding.len(),
                "embedding backend returned unexpected dimension"
            );
        }
        Some(parsed.embedding)
    }
}

/// Builds the backend named by `config`. Any `api` other than `"local"` and
/// `"disabled"` is treated as a hosted endpoint URL.
pub fn backend_for(config: &EmbeddingConfig) -> Box<dyn EmbeddingBackend> {
    if !config.enabled {
        return Box::new(DisabledBackend);
    }
    match config.api.as_str() {
        "local" => Box::new(RemoteApiBackend::new("http://localhost:8008/embed", config.dim)),
        url => Box::new(RemoteApiBackend::new(url, config.dim)),
    }
}
