//! Architect — turns a design intent into a blueprint node, caches by
//! hash and semantic similarity, and hands builder tasks to the rest of
//! PTC to execute. Grounded on `ptc/architect.py`: "Claude designs. PTC
//! decomposes. Builders execute. Results flow back."

pub mod cache;
pub mod generate;
pub mod lifecycle;
pub mod tasks;
pub mod validate;

pub use cache::{cache_check, hash_intent};
pub use generate::BlueprintContext;
pub use lifecycle::verify;
pub use tasks::blueprint_to_tasks;
pub use validate::{validate, ValidationResult};

use chrono::Utc;
use ptc_core::{
    ArtifactKind, Blueprint, BlueprintAcceptance, BlueprintContent, BlueprintExecution, BlueprintStatus, Error, Result,
    TaskResult,
};
use ptc_embed::EmbeddingIndex;
use ptc_git::GitLayer;
use ptc_store::{ContentStore, DocumentStore};
use std::sync::Arc;
use tracing::debug;

const BLUEPRINTS_COLLECTION: &str = "blueprints";

/// Ties the Architect flow to its four collaborators. `git` is `None`
/// when the workspace isn't running inside a git repository — every git
/// step is best-effort, matching the original's `except ImportError: pass`.
#[derive(Clone)]
pub struct Architect {
    docs: Arc<dyn DocumentStore>,
    content: ContentStore,
    embeddings: EmbeddingIndex,
    git: Option<GitLayer>,
    project: String,
}

impl Architect {
    pub fn new(docs: Arc<dyn DocumentStore>, content: ContentStore, embeddings: EmbeddingIndex, git: Option<GitLayer>, project: impl Into<String>) -> Self {
        Self { docs, content, embeddings, git, project: project.into() }
    }

    /// The full 8-step flow: cache check, generate, dual-write, embed,
    /// git-commit, return. Returns immediately on a cache hit — zero new
    /// content is generated.
    pub async fn create_blueprint(&self, intent: &str, context: &BlueprintContext) -> Result<Blueprint> {
        if let Some(mut cached) = cache_check(&self.docs, &self.embeddings, intent).await? {
            debug!(blueprint_id = %cached.id, "blueprint cache hit, zero tokens spent");
            cached.cached = true;
            return Ok(cached);
        }

        let id = generate::generate_id(intent);
        let now = Utc::now();

        let content = BlueprintContent {
            what: intent.to_string(),
            location: ptc_core::BlueprintWhere {
                files: context.files.clone(),
                modules: generate::infer_modules(context),
                endpoints: Vec::new(),
            },
            how: ptc_core::BlueprintHow {
                approach: None,
                patterns: generate::infer_patterns(context),
                dependencies: Vec::new(),
            },
            why: None,
            gui_spec: None,
            data_flow: None,
            interconnections: generate::infer_interconnections(context),
            builder_tasks: Vec::new(),
            acceptance: BlueprintAcceptance {
                criteria: Vec::new(),
                verification_intent: Some(format!("verify {}", generate::intent_to_name(intent))),
            },
        };

        let content_value = serde_json::to_value(&content)?;
        let content_hash = ptc_store::content_hash(&cache::stable_json(&content_value));

        let blueprint = Blueprint {
            id,
            name: generate::intent_to_name(intent),
            content,
            content_hash,
            intent_hash: hash_intent(intent),
            status: BlueprintStatus::Draft,
            blueprint_version: 1,
            cached: false,
            project: context.project.clone().unwrap_or_else(|| self.project.clone()),
            created_at: now,
            execution: BlueprintExecution::default(),
            children: Vec::new(),
        };

        self.store_blueprint(&blueprint).await?;
        self.embeddings.embed_blueprint(&blueprint).await;

        if let Some(git) = &self.git {
            if git.branch_for_blueprint(&blueprint.id).await.is_ok() {
                let _ = git
                    .commit_artifact(
                        &blueprint.id,
                        "blueprint",
                        &blueprint.content.location.files,
                        &blueprint.content_hash,
                        Some(&format!("blueprint: {intent}")),
                    )
                    .await;
            }
        }

        Ok(blueprint)
    }

    /// Roll task results up into the blueprint's status, then persist.
    pub async fn verify(&self, blueprint: &mut Blueprint, results: &[TaskResult]) -> Result<()> {
        lifecycle::verify(blueprint, results);
        self.store_blueprint(blueprint).await
    }

    /// Deep-merge `updates` onto the blueprint's content, re-hash,
    /// re-store, re-embed.
    pub async fn update(&self, blueprint_id: &str, updates: serde_json::Value) -> Result<Blueprint> {
        let mut blueprint = self.load_blueprint(blueprint_id).await?;

        let mut content_value = serde_json::to_value(&blueprint.content)?;
        lifecycle::merge_into(&mut content_value, updates);
        blueprint.content = serde_json::from_value(content_value.clone())?;
        blueprint.content_hash = ptc_store::content_hash(&cache::stable_json(&content_value));
        blueprint.blueprint_version += 1;

        self.store_blueprint(&blueprint).await?;
        self.embeddings.embed_blueprint(&blueprint).await;

        Ok(blueprint)
    }

    pub async fn list_blueprints(&self, status: Option<BlueprintStatus>) -> Result<Vec<Blueprint>> {
        let docs = self.docs.get(BLUEPRINTS_COLLECTION, &serde_json::json!({}), usize::MAX).await?;
        let blueprints: Vec<Blueprint> = docs.into_iter().filter_map(|d| serde_json::from_value(d).ok()).collect();
        Ok(match status {
            Some(status) => blueprints.into_iter().filter(|b| b.status == status).collect(),
            None => blueprints,
        })
    }

    async fn load_blueprint(&self, blueprint_id: &str) -> Result<Blueprint> {
        let found = self
            .docs
            .get(BLUEPRINTS_COLLECTION, &serde_json::json!({"id": blueprint_id}), usize::MAX)
            .await?;
        let doc = found.last().ok_or_else(|| Error::StoreError(format!("blueprint {blueprint_id} not found")))?;
        serde_json::from_value(doc.clone()).map_err(Error::from)
    }

    async fn store_blueprint(&self, blueprint: &Blueprint) -> Result<()> {
        let value = serde_json::to_value(blueprint)?;
        self.docs.put(BLUEPRINTS_COLLECTION, value.clone()).await?;
        self.content
            .dual_store(&blueprint.id, ArtifactKind::Blueprint, &cache::stable_json(&value), &blueprint.project)
            .await?;
        Ok(())
    }
}
