//! Two-level blueprint cache: exact intent-hash match, then vector
//! similarity. Grounded on `ptc/architect.py::cache_check` — a hit here
//! means a design intent is served for zero tokens.

use ptc_core::{Blueprint, Result};
use ptc_embed::EmbeddingIndex;
use ptc_store::{content_hash, DocumentStore};
use serde_json::Value;
use std::sync::Arc;

/// Minimum cosine similarity for a semantic cache hit.
pub const SIMILARITY_THRESHOLD: f32 = 0.9;

pub fn hash_intent(intent: &str) -> String {
    content_hash(&intent.trim().to_lowercase())
}

pub async fn cache_check(
    docs: &Arc<dyn DocumentStore>,
    embeddings: &EmbeddingIndex,
    intent: &str,
) -> Result<Option<Blueprint>> {
    let intent_hash = hash_intent(intent);

    let exact = docs
        .get("blueprints", &serde_json::json!({"intent_hash": intent_hash}), usize::MAX)
        .await?;
    if let Some(doc) = exact.last() {
        if let Ok(bp) = serde_json::from_value::<Blueprint>(doc.clone()) {
            return Ok(Some(bp));
        }
    }

    let similar = embeddings.find_similar_blueprints(intent, 1).await?;
    if let Some(top) = similar.first() {
        let score = top.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
        if score >= SIMILARITY_THRESHOLD {
            if let Some(bp_id) = top.get("blueprint_id").and_then(|v| v.as_str()) {
                let found = docs.get("blueprints", &serde_json::json!({"id": bp_id}), usize::MAX).await?;
                if let Some(doc) = found.last() {
                    if let Ok(bp) = serde_json::from_value::<Blueprint>(doc.clone()) {
                        return Ok(Some(bp));
                    }
                }
            }
        }
    }

    Ok(None)
}

/// Deterministic JSON text for hashing. `serde_json::Map` is a `BTreeMap`
/// in this workspace (no `preserve_order` feature), so a plain
/// `to_string` already sorts keys at every nesting level — the equivalent
/// of the original's `json.dumps(sort_keys=True)`.
pub fn stable_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
