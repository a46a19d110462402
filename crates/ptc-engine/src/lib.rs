//! The PTC Engine — one `(tree, intent, target?, dry_run)` run through the
//! eight phases (INTAKE → TRIAGE → PLAN → REVIEW → EXECUTE → VERIFY →
//! INTEGRATE → SHIP). Grounded on `ptc/engine.py::run`.

pub mod aggregate;
pub mod decompose;
pub mod route;

use chrono::Utc;
use ptc_core::event::{ESCALATION, EXECUTE as EXECUTE_EVENT, PHASE};
use ptc_core::{
    ArtifactKind, EscalationRecord, EventBus, NodeId, PtcEvent, ResultStatus, TaskResult, Trace,
    TraceStatus,
};
use ptc_executor::{check_approval, Executor};
use ptc_store::ContentStore;
use ptc_tree::Tree;
use tokio_util::sync::CancellationToken;

const TRIAGE_TOP_N: usize = 10;

pub struct Engine {
    tree: Tree,
    executor: Executor,
    content: ContentStore,
    events: EventBus,
}

impl Engine {
    pub fn new(tree: Tree, executor: Executor, content: ContentStore, events: EventBus) -> Self {
        Self { tree, executor, content, events }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn emit_phase(&self, run_id: &str, phase: &str, value: serde_json::Value) {
        self.events.emit(PtcEvent::new(PHASE, run_id, value_with_phase(value, phase)));
    }

    /// Run the full pipeline to completion, or to a [`TraceStatus::Cancelled`]
    /// partial trace if `cancel` fires between phases. Phases never check
    /// `cancel` mid-flight — only at the boundaries between them.
    pub async fn run(&self, intent: &str, target: Option<NodeId>, dry_run: bool, cancel: &CancellationToken) -> Trace {
        let ts_start = Utc::now();
        let run_id = format!("ptc-{}", ts_start.timestamp());

        // Phase 1: INTAKE
        self.emit_phase(
            &run_id,
            "INTAKE",
            serde_json::json!({
                "intent": intent,
                "target": target.as_ref().map(NodeId::as_str),
                "dry_run": dry_run,
                "tree": self.tree.meta.title,
                "node_count": self.tree.len(),
            }),
        );

        if cancel.is_cancelled() {
            return self.cancelled_trace(&run_id, intent, target, dry_run, ts_start, vec!["INTAKE".to_string()]);
        }

        // Phase 2: TRIAGE
        let ranking = route::route_intent(&self.tree, intent);
        self.emit_phase(
            &run_id,
            "TRIAGE",
            serde_json::json!({
                "matches": ranking.iter().take(TRIAGE_TOP_N).map(|(s, n)| serde_json::json!({"node_id": n.as_str(), "score": s})).collect::<Vec<_>>(),
            }),
        );

        if cancel.is_cancelled() {
            return self.cancelled_trace(&run_id, intent, target, dry_run, ts_start, vec!["INTAKE".into(), "TRIAGE".into()]);
        }

        // Phase 3: PLAN
        let tasks = decompose::decompose(&self.tree, intent, target.as_ref(), &ranking);
        self.emit_phase(
            &run_id,
            "PLAN",
            serde_json::json!({"task_count": tasks.len(), "leaf_nodes": tasks.iter().map(|t| t.node_id.as_str()).collect::<Vec<_>>()}),
        );

        if tasks.is_empty() {
            return Trace {
                run_id,
                intent: intent.to_string(),
                target,
                dry_run,
                tree_title: self.tree.meta.title.clone(),
                status: TraceStatus::NoMatch,
                phases_used: vec!["INTAKE".into(), "TRIAGE".into(), "PLAN".into()],
                tasks_decomposed: 0,
                tasks_approved: 0,
                tasks_blocked: 0,
                tasks_executed: 0,
                tasks_completed: 0,
                tasks_failed: 0,
                escalations: vec![],
                leaf_results: vec![],
                aggregated: None,
                duration_ms: (Utc::now() - ts_start).num_milliseconds().max(0) as u64,
                timestamp: Utc::now(),
            };
        }

        if cancel.is_cancelled() {
            return self.cancelled_trace(&run_id, intent, target, dry_run, ts_start, vec!["INTAKE".into(), "TRIAGE".into(), "PLAN".into()]);
        }

        // Phase 4: REVIEW
        let mut approved = Vec::new();
        let mut blocked_results = Vec::new();
        for task in tasks.iter() {
            let decision = check_approval(task, &self.events);
            if decision.blocked {
                blocked_results.push(TaskResult {
                    node_id: task.node_id.clone(),
                    node_name: task.node_name.clone(),
                    scale: task.scale,
                    intent: task.intent.clone(),
                    lineage: task.lineage.clone(),
                    status: ResultStatus::Blocked,
                    started_at: Utc::now(),
                    completed_at: Some(Utc::now()),
                    output: serde_json::json!({"reason": decision.reason, "risk": decision.risk, "escalated_to": decision.escalated_to.as_ref().map(NodeId::as_str)}),
                    artifacts: vec![],
                    error: None,
                    escalated_to: decision.escalated_to,
                    escalation_reason: Some(decision.reason),
                });
            } else {
                approved.push(task.clone());
            }
        }

        if cancel.is_cancelled() {
            let mut trace = self.cancelled_trace(&run_id, intent, target, dry_run, ts_start, vec!["INTAKE".into(), "TRIAGE".into(), "PLAN".into(), "REVIEW".into()]);
            trace.tasks_decomposed = tasks.len() as u32;
            trace.tasks_blocked = blocked_results.len() as u32;
            trace.leaf_results = blocked_results;
            return trace;
        }

        // Phase 5: EXECUTE
        let mut results = blocked_results;
        for task in &approved {
            self.events.emit(PtcEvent::new(EXECUTE_EVENT, format!("{run_id}/{}", task.node_id.as_str()), serde_json::json!({"node": task.node_id.as_str(), "intent": task.intent})));

            let result = if dry_run {
                TaskResult {
                    node_id: task.node_id.clone(),
                    node_name: task.node_name.clone(),
                    scale: task.scale,
                    intent: task.intent.clone(),
                    lineage: task.lineage.clone(),
                    status: ResultStatus::Planned,
                    started_at: Utc::now(),
                    completed_at: Some(Utc::now()),
                    output: serde_json::json!({
                        "plan": format!("Would execute: {}", task.intent),
                        "files": task.files,
                        "functions": task.functions,
                        "rules_applied": task.rules.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
                    }),
                    artifacts: vec![],
                    error: None,
                    escalated_to: None,
                    escalation_reason: None,
                }
            } else {
                self.executor.execute(task).await
            };

            results.push(result);
        }

        // Phase 6: VERIFY
        let tasks_completed = results.iter().filter(|r| matches!(r.status, ResultStatus::Completed | ResultStatus::Planned)).count() as u32;
        let tasks_failed = results.iter().filter(|r| r.status == ResultStatus::Failed).count() as u32;

        let mut escalations = Vec::new();
        for result in results.iter().filter(|r| r.status == ResultStatus::Failed) {
            if let Some(node) = self.tree.node(&result.node_id) {
                if let Some(to) = &node.escalation.target_id {
                    escalations.push(EscalationRecord {
                        from: result.node_id.clone(),
                        to: to.clone(),
                        reason: result.error.clone().unwrap_or_default(),
                        cascade: node.escalation.cascade.clone(),
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            let mut trace = self.cancelled_trace(
                &run_id,
                intent,
                target,
                dry_run,
                ts_start,
                vec!["INTAKE".into(), "TRIAGE".into(), "PLAN".into(), "REVIEW".into(), "EXECUTE".into(), "VERIFY".into()],
            );
            trace.tasks_decomposed = tasks.len() as u32;
            trace.tasks_approved = approved.len() as u32;
            trace.tasks_executed = approved.len() as u32;
            trace.tasks_completed = tasks_completed;
            trace.tasks_failed = tasks_failed;
            trace.escalations = escalations;
            trace.leaf_results = results;
            return trace;
        }

        // Phase 7: INTEGRATE
        let aggregated = aggregate::aggregate(&self.tree, &results, target.as_ref());
        for esc in &escalations {
            self.events.emit(PtcEvent::new(ESCALATION, esc.from.as_str(), serde_json::json!({"from": esc.from.as_str(), "to": esc.to.as_str(), "reason": esc.reason})));
        }

        // Phase 8: SHIP
        let status = classify_status(tasks.len(), approved.len(), tasks_completed as usize, tasks_failed as usize, approved.len());
        let duration_ms = (Utc::now() - ts_start).num_milliseconds().max(0) as u64;

        let trace = Trace {
            run_id: run_id.clone(),
            intent: intent.to_string(),
            target,
            dry_run,
            tree_title: self.tree.meta.title.clone(),
            status,
            phases_used: vec!["INTAKE".into(), "TRIAGE".into(), "PLAN".into(), "REVIEW".into(), "EXECUTE".into(), "VERIFY".into(), "INTEGRATE".into(), "SHIP".into()],
            tasks_decomposed: tasks.len() as u32,
            tasks_approved: approved.len() as u32,
            tasks_blocked: (tasks.len() - approved.len()) as u32,
            tasks_executed: approved.len() as u32,
            tasks_completed,
            tasks_failed,
            escalations,
            leaf_results: results,
            aggregated,
            duration_ms,
            timestamp: Utc::now(),
        };

        self.emit_phase(&run_id, "SHIP", serde_json::json!({"status": trace.status}));

        if let Ok(trace_json) = serde_json::to_string_pretty(&trace) {
            let _ = self.content.dual_store(&format!("ptc-trace-{run_id}"), ArtifactKind::PtcTrace, &trace_json, "ptc").await;
        }

        trace
    }

    fn cancelled_trace(&self, run_id: &str, intent: &str, target: Option<NodeId>, dry_run: bool, ts_start: chrono::DateTime<Utc>, phases_used: Vec<String>) -> Trace {
        Trace {
            run_id: run_id.to_string(),
            intent: intent.to_string(),
            target,
            dry_run,
            tree_title: self.tree.meta.title.clone(),
            status: TraceStatus::Cancelled,
            phases_used,
            tasks_decomposed: 0,
            tasks_approved: 0,
            tasks_blocked: 0,
            tasks_executed: 0,
            tasks_completed: 0,
            tasks_failed: 0,
            escalations: vec![],
            leaf_results: vec![],
            aggregated: None,
            duration_ms: (Utc::now() - ts_start).num_milliseconds().max(0) as u64,
            timestamp: Utc::now(),
        }
    }
}

fn value_with_phase(mut value: serde_json::Value, phase: &str) -> serde_json::Value {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("phase".to_string(), serde_json::json!(phase));
    }
    value
}

/// Classify the overall run per spec.md §4.8's five-way bucket. Not spelled
/// out as a formula in the original (which just nests raw dicts) — this
/// implementation's reading: fully clean only if every approved task
/// completed and nothing was blocked at REVIEW; any blocked tasks alongside
/// real completions is `partial_blocked`, blocked tasks alone is `blocked`;
/// otherwise failures without/with completions are `failed`/`partial`.
fn classify_status(decomposed: usize, approved: usize, completed: usize, failed: usize, executed: usize) -> TraceStatus {
    let blocked = decomposed - approved;

    if blocked > 0 && completed == 0 && failed == 0 {
        return TraceStatus::Blocked;
    }
    if failed == 0 && completed == executed && blocked == 0 {
        return TraceStatus::Completed;
    }
    if blocked > 0 && completed > 0 {
        return TraceStatus::PartialBlocked;
    }
    if failed > 0 && completed > 0 {
        return TraceStatus::Partial;
    }
    if failed > 0 {
        return TraceStatus::Failed;
    }
    TraceStatus::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_completed_with_nothing_blocked_is_completed() {
        assert_eq!(classify_status(3, 3, 3, 0, 3), TraceStatus::Completed);
    }

    #[test]
    fn blocked_only_with_no_completions_is_blocked() {
        assert_eq!(classify_status(2, 0, 0, 0, 0), TraceStatus::Blocked);
    }

    #[test]
    fn blocked_alongside_completions_is_partial_blocked() {
        assert_eq!(classify_status(3, 2, 2, 0, 2), TraceStatus::PartialBlocked);
    }

    #[test]
    fn failures_alongside_completions_is_partial() {
        assert_eq!(classify_status(2, 2, 1, 1, 2), TraceStatus::Partial);
    }

    #[test]
    fn all_failed_is_failed() {
        assert_eq!(classify_status(2, 2, 0, 2, 2), TraceStatus::Failed);
    }

    use ptc_architect::Architect;
    use ptc_core::{Config, Node, NodeMetadata, Scale, TreeDocument};
    use ptc_embed::{backend::DisabledBackend, EmbeddingIndex};
    use ptc_store::{HashOnlyBackend, MemoryDocumentStore};
    use std::sync::Arc;

    fn demo_tree() -> Tree {
        let root = Node {
            id: NodeId::from("root:ptc"),
            name: "PTC".into(),
            scale: Scale::Executive,
            parent: None,
            children: vec![NodeId::from("crate:auth")],
            rules: vec![],
            escalation: Default::default(),
            metadata: Default::default(),
        };
        let auth = Node {
            id: NodeId::from("crate:auth"),
            name: "auth".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("root:ptc")),
            children: vec![],
            rules: vec![],
            escalation: Default::default(),
            metadata: NodeMetadata { files: vec!["auth/login.rs".into()], ..Default::default() },
        };
        Tree::from_document(TreeDocument { meta: ptc_core::TreeMeta { title: "demo".into() }, coordination: Default::default(), nodes: vec![root, auth] }).unwrap()
    }

    fn demo_engine() -> Engine {
        let docs: Arc<dyn ptc_store::DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let content = ContentStore::new(docs.clone(), Arc::new(HashOnlyBackend), false);
        let embeddings = EmbeddingIndex::new(docs.clone(), Arc::new(DisabledBackend), false);
        let architect = Architect::new(docs, content.clone(), embeddings, None, "ptc".to_string());
        let executor = Executor::new(content.clone(), architect, EventBus::default(), Config::default(), ".");
        Engine::new(demo_tree(), executor, content, EventBus::default())
    }

    #[tokio::test]
    async fn dry_run_routes_and_plans_without_executing() {
        let engine = demo_engine();
        let trace = engine.run("check the login flow", None, true, &CancellationToken::new()).await;
        assert_eq!(trace.tasks_decomposed, 1);
        assert_eq!(trace.leaf_results[0].status, ResultStatus::Planned);
        assert_eq!(trace.status, TraceStatus::Completed);
    }

    #[tokio::test]
    async fn unmatched_intent_with_no_target_yields_no_match() {
        let engine = demo_engine();
        let trace = engine.run("xyzzy plugh quux", None, true, &CancellationToken::new()).await;
        assert_eq!(trace.status, TraceStatus::NoMatch);
        assert_eq!(trace.tasks_decomposed, 0);
    }

    #[tokio::test]
    async fn cancellation_before_the_run_yields_a_cancelled_trace() {
        let engine = demo_engine();
        let token = CancellationToken::new();
        token.cancel();
        let trace = engine.run("check the login flow", None, true, &token).await;
        assert_eq!(trace.status, TraceStatus::Cancelled);
        assert_eq!(trace.phases_used, vec!["INTAKE".to_string()]);
    }
}
