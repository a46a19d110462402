//! Embedding Index — semantic search over traces, blueprints, and commits.
//!
//! Embedding generation is fire-and-forget: [`EmbeddingIndex::embed_and_store`]
//! spawns the embed call and returns immediately so a slow or disabled
//! backend never blocks a caller. [`EmbeddingIndex::semantic_search`] tries
//! vector similarity first and falls back to text search the moment the
//! backend is unavailable, mirroring the original's MongoDB `$vectorSearch`
//! with a plain `search` fallback.

pub mod backend;
pub mod search;

pub use backend::{backend_for, DisabledBackend, EmbeddingBackend, RemoteApiBackend};

use chrono::Utc;
use ptc_core::{Blueprint, Result, Trace};
use ptc_store::DocumentStore;
use search::{cosine_similarity, text_matches};
use std::sync::Arc;

const EMBED_TEXT_LIMIT: usize = 2000;
const EMBEDDINGS_COLLECTION: &str = "embeddings";

#[derive(Clone)]
pub struct EmbeddingIndex {
    docs: Arc<dyn DocumentStore>,
    backend: Arc<dyn EmbeddingBackend>,
    enabled: bool,
}

impl EmbeddingIndex {
    pub fn new(docs: Arc<dyn DocumentStore>, backend: Arc<dyn EmbeddingBackend>, enabled: bool) -> Self {
        Self { docs, backend, enabled }
    }

    /// Compute an embedding for `text` and store it alongside `extra`
    /// fields on a background task. A no-op when embeddings are disabled.
    pub async fn embed_and_store(&self, doc_id: &str, text: &str, extra: serde_json::Value) {
        if !self.enabled {
            return;
        }
        let truncated: String = text.chars().take(EMBED_TEXT_LIMIT).collect();
        let docs = self.docs.clone();
        let backend = self.backend.clone();
        let doc_id = doc_id.to_string();
        tokio::spawn(async move {
            let Some(embedding) = backend.embed(&truncated).await else { return };
            let mut doc = serde_json::json!({
                "doc_id": doc_id,
                "collection": EMBEDDINGS_COLLECTION,
                "embedding": embedding,
                "embedded_at": Utc::now().to_rfc3339(),
            });
            if let (Some(base), serde_json::Value::Object(extra_map)) = (doc.as_object_mut(), extra) {
                for (k, v) in extra_map {
                    base.insert(k, v);
                }
            }
            let _ = docs.put(EMBEDDINGS_COLLECTION, doc).await;
        });
    }

    /// Vector search with graceful fallback to substring text search over
    /// `collection` when embeddings are disabled or produce nothing.
    pub async fn semantic_search(&self, source_type: &str, query: &str, limit: usize) -> Result<Vec<serde_json::Value>> {
        if self.enabled {
            if let Some(query_vec) = self.backend.embed(query).await {
                let candidates = self
                    .docs
                    .get(EMBEDDINGS_COLLECTION, &serde_json::json!({"source_type": source_type}), usize::MAX)
                    .await?;
                let mut scored: Vec<(f32, serde_json::Value)> = candidates
                    .into_iter()
                    .filter_map(|doc| {
                        let embedding: Vec<f32> = doc.get("embedding")?.as_array()?.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
                        let score = cosine_similarity(&query_vec, &embedding);
                        Some((score, doc))
                    })
                    .collect();
                if !scored.is_empty() {
                    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
                    scored.truncate(limit);
                    return Ok(scored
                        .into_iter()
                        .map(|(score, mut doc)| {
                            if let Some(obj) = doc.as_object_mut() {
                                obj.insert("score".into(), serde_json::json!(score));
                            }
                            doc
                        })
                        .collect());
                }
            }
        }

        // Text-search fallback: scan whatever documents the embeddings
        // collection holds for this source type and match on name/content.
        let docs = self
            .docs
            .get(EMBEDDINGS_COLLECTION, &serde_json::json!({"source_type": source_type}), usize::MAX)
            .await?;
        let matched: Vec<serde_json::Value> = docs
            .into_iter()
            .filter(|doc| {
                let haystack = doc
                    .get("content")
                    .or_else(|| doc.get("name"))
                    .or_else(|| doc.get("intent"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                text_matches(haystack, query)
            })
            .take(limit)
            .collect();
        Ok(matched)
    }

    pub async fn find_similar_traces(&self, intent: &str, limit: usize) -> Result<Vec<serde_json::Value>> {
        self.semantic_search("trace", &format!("Intent: {}", intent), limit).await
    }

    pub async fn find_related_commits(&self, query: &str, limit: usize) -> Result<Vec<serde_json::Value>> {
        self.semantic_search("commit", &format!("Commit: {}", query), limit).await
    }

    pub async fn find_similar_blueprints(&self, intent: &str, limit: usize) -> Result<Vec<serde_json::Value>> {
        self.semantic_search("blueprint", &format!("Blueprint: {}", intent), limit).await
    }

    pub async fn embed_trace(&self, trace: &Trace) -> String {
        let doc_id = trace.run_id.clone();
        let mut parts = vec![
            format!("Intent: {}", trace.intent),
            format!("Tree: {}", trace.tree_title),
            format!("Tasks: {} decomposed, {} completed", trace.tasks_decomposed, trace.tasks_completed),
        ];
        for leaf in &trace.leaf_results {
            let plan = leaf.output.get("plan").and_then(|v| v.as_str()).unwrap_or("");
            parts.push(format!("Node {}: {}", leaf.node_name, plan));
            if let Some(files) = leaf.output.get("files").and_then(|v| v.as_array()) {
                for f in files.iter().filter_map(|v| v.as_str()) {
                    parts.push(format!("File: {}", f));
                }
            }
        }
        let text = parts.join("\n");
        self.embed_and_store(
            &doc_id,
            &text,
            serde_json::json!({"source_type": "trace", "intent": trace.intent, "tree": trace.tree_title}),
        )
        .await;
        doc_id
    }

    pub async fn embed_commit(&self, sha: &str, message: &str, diff_summary: &str) -> String {
        let doc_id = format!("commit-{}", &sha[..sha.len().min(12)]);
        let text = format!("Commit {}: {}\n{}", &sha[..sha.len().min(8)], message, diff_summary);
        self.embed_and_store(&doc_id, &text, serde_json::json!({"source_type": "commit", "sha": sha, "message": message})).await;
        doc_id
    }

    pub async fn embed_blueprint(&self, blueprint: &Blueprint) -> String {
        let doc_id = blueprint.id.clone();
        let mut parts = vec![format!("Blueprint: {}", blueprint.name)];
        parts.push(format!("What: {}", blueprint.content.what));
        if let Some(why) = &blueprint.content.why {
            parts.push(format!("Why: {}", why));
        }
        if let Some(approach) = &blueprint.content.how.approach {
            parts.push(format!("Approach: {}", approach));
        }
        for task in &blueprint.content.builder_tasks {
            parts.push(format!("Task: {}", task.intent));
            for f in &task.files {
                parts.push(format!("File: {}", f));
            }
        }
        let text = parts.join("\n");
        self.embed_and_store(
            &doc_id,
            &text,
            serde_json::json!({"source_type": "blueprint", "blueprint_id": doc_id, "name": blueprint.name}),
        )
        .await;
        doc_id
    }
}
