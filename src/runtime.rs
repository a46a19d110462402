//! Wires the collaborator stack (document store, content store, embedding
//! index, git layer, architect) into an [`Executor`]/[`Engine`] pair.
//! Grounded on `ptc/engine.py::run`'s module-level singletons, which the
//! original assembles once at import time from the same `os.environ`
//! settings [`ptc_core::Config`] now carries.

use ptc_architect::Architect;
use ptc_core::Config;
use ptc_embed::EmbeddingIndex;
use ptc_engine::Engine;
use ptc_executor::Executor;
use ptc_git::GitLayer;
use ptc_store::{ContentStore, DocumentStore, MemoryDocumentStore};
use ptc_tree::Tree;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The shared collaborators a run's [`Executor`]/[`Engine`]/direct-leaf
/// path are all built from. Every field is cheaply `Clone`, so the same
/// set backs both a full pipeline run and a `--node`/`--task` direct
/// invocation within one process.
#[derive(Clone)]
pub struct Collaborators {
    pub content: ContentStore,
    pub architect: Architect,
}

pub fn assemble(config: &Config, root: &Path, project: &str) -> Collaborators {
    let docs: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());

    let object_backend = Arc::from(ptc_store::backend_for(&config.object_store, std::env::var("PTC_PINATA_JWT").ok()));
    let content = ContentStore::new(docs.clone(), object_backend, config.object_store.enabled);

    let embed_backend = Arc::from(ptc_embed::backend_for(&config.embedding));
    let embeddings = EmbeddingIndex::new(docs.clone(), embed_backend, config.embedding.enabled);

    let git = config.git.enabled.then(|| GitLayer::new(root));
    let architect = Architect::new(docs, content.clone(), embeddings, git, project.to_string());

    Collaborators { content, architect }
}

pub fn build_executor(collab: &Collaborators, config: Config, root: impl Into<PathBuf>, events: ptc_core::EventBus) -> Executor {
    Executor::new(collab.content.clone(), collab.architect.clone(), events, config, root)
}

pub fn build_engine(tree: Tree, collab: &Collaborators, config: Config, root: impl Into<PathBuf>, events: ptc_core::EventBus) -> Engine {
    let executor = build_executor(collab, config, root, events.clone());
    Engine::new(tree, executor, collab.content.clone(), events)
}
