//! Fast-query side of the dual-write Content Store.
//!
//! The original implementation backs this with MongoDB (`mongodb/store.js`)
//! called out to via `subprocess.Popen`. There is no database dependency in
//! this workspace, so [`MemoryDocumentStore`] keeps collections in memory —
//! callers needing durable storage implement [`DocumentStore`] against
//! whatever backend their deployment provides.

use async_trait::async_trait;
use dashmap::DashMap;
use ptc_core::Result;
use serde_json::Value;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document into `collection`.
    async fn put(&self, collection: &str, doc: Value) -> Result<()>;

    /// Fetch up to `limit` documents from `collection` matching `query`.
    /// An empty query matches everything.
    async fn get(&self, collection: &str, query: &Value, limit: usize) -> Result<Vec<Value>>;

    /// Append a structured log entry, e.g. `"ipfs:pinned"` events.
    async fn log(&self, collection: &str, event: &str, key: &str, doc: Value) -> Result<()>;

    /// Merge `patch` onto the most recent document in `collection` whose
    /// `hash` field equals `hash`, or that carries no `hash` field yet.
    /// The latter case backfills a document written before this store
    /// computed hashes at all (`migrate_existing`); the former backfills a
    /// CID after a fire-and-forget object-store add completes.
    async fn update_by_hash(&self, collection: &str, hash: &str, patch: Value) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Value, query: &Value) -> bool {
    let Value::Object(q) = query else { return true };
    if q.is_empty() {
        return true;
    }
    let Value::Object(d) = doc else { return false };
    q.iter().all(|(k, v)| d.get(k) == Some(v))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, collection: &str, doc: Value) -> Result<()> {
        self.collections.entry(collection.to_string()).or_default().push(doc);
        Ok(())
    }

    async fn get(&self, collection: &str, query: &Value, limit: usize) -> Result<Vec<Value>> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs.iter().filter(|d| matches(d, query)).take(limit).cloned().collect(),
            None => Vec::new(),
        };
        Ok(docs)
    }

    async fn log(&self, collection: &str, event: &str, key: &str, doc: Value) -> Result<()> {
        self.put(
            collection,
            serde_json::json!({"event": event, "key": key, "doc": doc}),
        )
        .await
    }

    async fn update_by_hash(&self, collection: &str, hash: &str, patch: Value) -> Result<()> {
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if let Some(doc) = docs.iter_mut().rev().find(|d| {
            let existing = d.get("hash").and_then(|h| h.as_str());
            existing == Some(hash) || existing.is_none()
        }) {
            if let (Value::Object(doc_map), Value::Object(patch_map)) = (doc, patch) {
                for (k, v) in patch_map {
                    doc_map.insert(k, v);
                }
            }
        }
        Ok(())
    }
}
