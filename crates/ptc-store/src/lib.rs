//! Content Store — dual-write artifact storage.
//!
//! Every artifact is hashed and written to a fast-query [`DocumentStore`]
//! immediately; the matching [`ObjectBackend`] add is fired-and-forgotten on
//! a background task so a slow or unavailable object store never blocks the
//! caller. Both sides are bridged by the SHA-256 hash computed up front.

pub mod document_store;
pub mod hash;
pub mod object_store;

pub use document_store::{DocumentStore, MemoryDocumentStore};
pub use hash::content_hash;
pub use object_store::{backend_for, HashOnlyBackend, LocalDaemonBackend, ObjectBackend, PinningServiceBackend};

use chrono::Utc;
use ptc_core::{Artifact, ArtifactKind, Result, StorageTier};
use std::sync::Arc;

const INLINE_CONTENT_LIMIT: usize = 50_000;

#[derive(Debug, Clone, Default)]
pub struct MigrationStats {
    pub processed: usize,
    pub hashed: usize,
    pub object_added: usize,
    pub skipped: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct ContentStore {
    docs: Arc<dyn DocumentStore>,
    backend: Arc<dyn ObjectBackend>,
    enabled: bool,
}

impl ContentStore {
    pub fn new(docs: Arc<dyn DocumentStore>, backend: Arc<dyn ObjectBackend>, enabled: bool) -> Self {
        Self { docs, backend, enabled }
    }

    /// Store `content` under `name`, hashing it and writing the document
    /// record synchronously. The object-store add happens on a spawned
    /// task; the returned [`Artifact`] reflects the pre-add state, matching
    /// the "IPFS add is fire-and-forget, never blocks" contract.
    pub async fn dual_store(
        &self,
        name: &str,
        kind: ArtifactKind,
        content: &str,
        project: &str,
    ) -> Result<Artifact> {
        let chash = content_hash(content);
        let storage = if self.enabled { StorageTier::ObjectStore } else { StorageTier::DocumentStore };
        let now = Utc::now();

        let truncated: String = content.chars().take(INLINE_CONTENT_LIMIT).collect();
        self.docs
            .put(
                "artifacts",
                serde_json::json!({
                    "name": name,
                    "type": kind,
                    "content": truncated,
                    "project": project,
                    "hash": chash,
                    "storage": storage,
                    "object_cid": null,
                    "_ts": now.to_rfc3339(),
                }),
            )
            .await?;

        let artifact = Artifact {
            name: name.to_string(),
            kind,
            content: content.to_string(),
            project: project.to_string(),
            hash: chash.clone(),
            storage,
            object_cid: None,
            timestamp: now,
        };

        if self.enabled {
            let docs = self.docs.clone();
            let backend = self.backend.clone();
            let content_bytes = content.as_bytes().to_vec();
            let hash_for_task = chash;
            tokio::spawn(async move {
                if let Some(cid) = backend.add(&content_bytes).await {
                    let _ = docs
                        .update_by_hash(
                            "artifacts",
                            &hash_for_task,
                            serde_json::json!({"object_cid": cid, "storage": "object_store"}),
                        )
                        .await;
                    let _ = docs
                        .log("artifacts", "object_store:pinned", &hash_for_task, serde_json::json!({"cid": cid}))
                        .await;
                }
            });
        }

        Ok(artifact)
    }

    /// Backfill object-store identifiers for documents that predate this
    /// store (or were written while the backend was disabled). Idempotent:
    /// documents that already carry a hash and an object-store tier are
    /// skipped.
    pub async fn migrate_existing(&self, collection: &str, batch_size: usize) -> Result<MigrationStats> {
        let mut stats = MigrationStats::default();
        let docs = self.docs.get(collection, &serde_json::json!({}), batch_size).await?;

        for doc in docs {
            stats.processed += 1;
            let existing_hash = doc.get("hash").and_then(|h| h.as_str());
            let storage = doc.get("storage").and_then(|s| s.as_str());
            if existing_hash.is_some() && storage == Some("object_store") {
                stats.skipped += 1;
                continue;
            }

            let content = doc.get("content").and_then(|c| c.as_str()).unwrap_or("");
            let chash = content_hash(content);
            stats.hashed += 1;

            let mut object_cid = None;
            if self.enabled && !content.is_empty() {
                object_cid = self.backend.add(content.as_bytes()).await;
                if object_cid.is_some() {
                    stats.object_added += 1;
                }
            }

            let storage = if object_cid.is_some() { StorageTier::ObjectStore } else { StorageTier::DocumentStore };
            self.docs
                .update_by_hash(collection, &chash, serde_json::json!({"hash": chash, "storage": storage, "object_cid": object_cid}))
                .await?;
        }

        Ok(stats)
    }
}
