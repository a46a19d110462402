//! The Executor — detects a task's mode, gates it through the approval
//! check, dispatches to the matching handler, and wraps the result into
//! a [`TaskResult`]. Grounded on `ptc/executor.py::Executor.execute`.

pub mod dispatch;
pub mod mode;
pub mod risk;
pub mod shell;

pub use mode::{detect_mode, Mode};
pub use risk::{check_approval, score_risk, ApprovalDecision, ApprovalLevel};

use chrono::Utc;
use ptc_architect::Architect;
use ptc_core::{ArtifactKind, Config, EventBus, ResultStatus, Task, TaskResult};
use ptc_store::ContentStore;
use std::path::PathBuf;

pub struct Executor {
    content: ContentStore,
    architect: Architect,
    events: EventBus,
    config: Config,
    root: PathBuf,
}

impl Executor {
    pub fn new(content: ContentStore, architect: Architect, events: EventBus, config: Config, root: impl Into<PathBuf>) -> Self {
        Self { content, architect, events, config, root: root.into() }
    }

    /// Detect mode, gate on approval where the mode carries real side
    /// effects, dispatch, and wrap the outcome into a [`TaskResult`].
    /// `compose` is deliberately absent from this path — `detect_mode`
    /// never selects it, so callers orchestrating an INTEGRATE-phase
    /// composition invoke [`dispatch::compose`] directly.
    pub async fn execute(&self, task: &Task) -> TaskResult {
        let started_at = Utc::now();
        let mode = detect_mode(task);

        let gated = matches!(mode, Mode::Native | Mode::Claude | Mode::Codie);
        let approval = gated.then(|| check_approval(task, &self.events));

        if let Some(decision) = &approval {
            if decision.blocked {
                return TaskResult {
                    node_id: task.node_id.clone(),
                    node_name: task.node_name.clone(),
                    scale: task.scale,
                    intent: task.intent.clone(),
                    lineage: task.lineage.clone(),
                    status: ResultStatus::Escalated,
                    started_at,
                    completed_at: Some(Utc::now()),
                    output: serde_json::json!({"mode": mode.as_str(), "risk": decision.risk}),
                    artifacts: Vec::new(),
                    error: None,
                    escalated_to: decision.escalated_to.clone(),
                    escalation_reason: Some(decision.reason.clone()),
                };
            }
        }

        let outcome = self.dispatch(mode, task, approval.as_ref()).await;

        let (output, status, error, artifacts) = match outcome {
            Ok(value) => {
                let mut artifacts = Vec::new();
                if let Ok(artifact) = self
                    .content
                    .dual_store(&format!("{}-{}", task.node_id.as_str(), mode.as_str()), ArtifactKind::Output, &value.to_string(), "ptc")
                    .await
                {
                    artifacts.push(artifact.hash);
                }
                (value, ResultStatus::Completed, None, artifacts)
            }
            Err(e) => (serde_json::json!({"mode": mode.as_str()}), ResultStatus::Failed, Some(e.to_string()), Vec::new()),
        };

        TaskResult {
            node_id: task.node_id.clone(),
            node_name: task.node_name.clone(),
            scale: task.scale,
            intent: task.intent.clone(),
            lineage: task.lineage.clone(),
            status,
            started_at,
            completed_at: Some(Utc::now()),
            output,
            artifacts,
            error,
            escalated_to: None,
            escalation_reason: None,
        }
    }

    async fn dispatch(&self, mode: Mode, task: &Task, approval: Option<&ApprovalDecision>) -> ptc_core::Result<serde_json::Value> {
        match mode {
            Mode::Plan => Ok(dispatch::plan(task)),
            Mode::Inspect => Ok(dispatch::inspect(task, &self.root).await),
            Mode::Shell => dispatch::shell(task, &self.root).await,
            Mode::Native => {
                let decision = approval.expect("native mode is always approval-gated");
                Ok(dispatch::native(task, &self.root, decision).await)
            }
            Mode::Claude => Ok(dispatch::claude(task, &self.root, &self.config).await),
            Mode::Design => dispatch::design(task, &self.architect).await,
            Mode::Codie => {
                let (result, source) = ptc_codie::execute_task(task, &self.root).await;
                let _ = self
                    .content
                    .dual_store(&format!("{}-codie", task.node_id.as_str()), ArtifactKind::CodieExecution, &source.to_string(), "ptc")
                    .await;
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_architect::Architect;
    use ptc_core::{Escalation, NodeId, Scale};
    use ptc_embed::{backend::DisabledBackend, EmbeddingIndex};
    use ptc_store::{HashOnlyBackend, MemoryDocumentStore};
    use std::sync::Arc;

    fn executor() -> Executor {
        let docs: Arc<dyn ptc_store::DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let content = ContentStore::new(docs.clone(), Arc::new(HashOnlyBackend), false);
        let embeddings = EmbeddingIndex::new(docs.clone(), Arc::new(DisabledBackend), false);
        let architect = Architect::new(docs, content.clone(), embeddings, None, "ptc".to_string());
        Executor::new(content, architect, EventBus::default(), Config::default(), ".")
    }

    fn task(intent: &str) -> Task {
        Task {
            node_id: NodeId::from("crate:ptc-core"),
            node_name: "ptc-core".into(),
            scale: Scale::Crate,
            intent: intent.to_string(),
            lineage: vec![],
            files: vec![],
            functions: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            codie_program: None,
            blueprint_id: None,
            task_id: None,
            acceptance: None,
            depends_on: vec![],
        }
    }

    #[tokio::test]
    async fn plan_mode_completes_without_gating() {
        let exec = executor();
        let result = exec.execute(&task("investigate the anomaly")).await;
        assert_eq!(result.status, ResultStatus::Completed);
        assert_eq!(result.output["mode"], serde_json::json!("plan"));
    }

    #[tokio::test]
    async fn destructive_native_intent_is_escalated_not_executed() {
        let exec = executor();
        let result = exec.execute(&task("nixos-rebuild switch to destroy the old generation")).await;
        assert_eq!(result.status, ResultStatus::Escalated);
        assert_eq!(result.escalated_to, Some(NodeId::from("root:human")));
    }

    #[tokio::test]
    async fn design_mode_delegates_to_architect() {
        let exec = executor();
        let result = exec.execute(&task("draft a blueprint for the billing retry flow")).await;
        assert_eq!(result.status, ResultStatus::Completed);
        assert!(result.output["blueprint_id"].is_string());
    }
}
