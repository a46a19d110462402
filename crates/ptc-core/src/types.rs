//! Data model shared by every PTC component: Node, Task, Result, Aggregated,
//! Trace, Artifact, Blueprint, Doc.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque node identifier, e.g. `dept:security`, `capt:docker`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Executive,
    Department,
    Captain,
    Module,
    Crate,
    /// Blueprint nodes created by the Architect (spec.md §3, Blueprint).
    Blueprint,
}

impl Scale {
    /// Base risk contribution used by the Executor's risk scorer (spec.md §4.6).
    pub fn base_risk(self) -> i32 {
        match self {
            Scale::Executive => 8,
            Scale::Department => 6,
            Scale::Captain => 3,
            Scale::Module => 2,
            Scale::Crate => 2,
            Scale::Blueprint => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Pass,
    Transform,
    Block,
    Escalate,
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub condition: String,
    pub action: RuleAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Escalation {
    pub target_id: Option<NodeId>,
    /// [1..10]
    pub threshold: Option<u8>,
    /// Recorded, not chained through — see SPEC_FULL.md §9 Open Questions.
    #[serde(default)]
    pub cascade: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeMetadata {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub crates_owned: Vec<String>,
    pub tier: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub scale: Scale,
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub escalation: Escalation,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A unit of work derived from a leaf node and an intent. Ephemeral: created
/// at PLAN, consumed at EXECUTE (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub node_id: NodeId,
    pub node_name: String,
    pub scale: Scale,
    pub intent: String,
    pub lineage: Vec<NodeId>,
    pub files: Vec<String>,
    pub functions: Vec<String>,
    pub rules: Vec<Rule>,
    pub escalation: Escalation,
    pub codie_program: Option<String>,
    pub blueprint_id: Option<String>,
    pub task_id: Option<String>,
    pub acceptance: Option<serde_json::Value>,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Pending,
    Planned,
    Executing,
    Completed,
    Failed,
    Blocked,
    Escalated,
}

/// The outcome of one task (spec.md §3, Result).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub node_id: NodeId,
    pub node_name: String,
    pub scale: Scale,
    pub intent: String,
    pub lineage: Vec<NodeId>,
    pub status: ResultStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub output: serde_json::Value,
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub error: Option<String>,
    pub escalated_to: Option<NodeId>,
    pub escalation_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggStatus {
    Completed,
    Failed,
    Partial,
    InProgress,
    Blocked,
    Escalated,
}

/// The recursive roll-up of results along the tree (spec.md §3, Aggregated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregated {
    pub node_id: NodeId,
    pub status: AggStatus,
    pub completed: u32,
    pub failed: u32,
    pub children_results: Vec<Aggregated>,
    pub escalation_target: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Completed,
    Partial,
    PartialBlocked,
    Blocked,
    Failed,
    NoMatch,
    Cancelled,
}

/// The permanent record of one PTC run (spec.md §3, Trace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub run_id: String,
    pub intent: String,
    pub target: Option<NodeId>,
    pub dry_run: bool,
    pub tree_title: String,
    pub status: TraceStatus,
    pub phases_used: Vec<String>,
    pub tasks_decomposed: u32,
    pub tasks_approved: u32,
    pub tasks_blocked: u32,
    pub tasks_executed: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub escalations: Vec<EscalationRecord>,
    pub leaf_results: Vec<TaskResult>,
    pub aggregated: Option<Aggregated>,
    pub duration_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub from: NodeId,
    pub to: NodeId,
    pub reason: String,
    #[serde(default)]
    pub cascade: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Code,
    Config,
    Doc,
    Output,
    Decision,
    Trace,
    Blueprint,
    Design,
    ClaudeOutput,
    CodieExecution,
    PtcTrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageTier {
    DocumentStore,
    ObjectStore,
}

/// A content-addressed artifact (spec.md §3, Artifact).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub content: String,
    pub project: String,
    pub hash: String,
    pub storage: StorageTier,
    pub object_cid: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintStatus {
    Draft,
    Approved,
    Building,
    Verified,
    Shipped,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuilderTask {
    pub task_id: String,
    pub target_node: NodeId,
    pub intent: String,
    #[serde(default)]
    pub files: Vec<String>,
    pub acceptance: Option<serde_json::Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintWhere {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub modules: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintHow {
    pub approach: Option<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintAcceptance {
    #[serde(default)]
    pub criteria: Vec<String>,
    pub verification_intent: Option<String>,
}

/// The single artifact content carried by a blueprint node (spec.md §3, Blueprint).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintContent {
    pub what: String,
    #[serde(rename = "where", default)]
    pub location: BlueprintWhere,
    #[serde(default)]
    pub how: BlueprintHow,
    pub why: Option<String>,
    pub gui_spec: Option<serde_json::Value>,
    pub data_flow: Option<serde_json::Value>,
    #[serde(default)]
    pub interconnections: Vec<NodeId>,
    #[serde(default)]
    pub builder_tasks: Vec<BuilderTask>,
    #[serde(default)]
    pub acceptance: BlueprintAcceptance,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlueprintExecution {
    pub completed: u32,
    pub failed: u32,
    pub in_flight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub name: String,
    pub content: BlueprintContent,
    pub content_hash: String,
    pub intent_hash: String,
    pub status: BlueprintStatus,
    pub blueprint_version: u32,
    pub cached: bool,
    pub project: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub execution: BlueprintExecution,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CrossRefs {
    #[serde(default)]
    pub structural: Vec<NodeId>,
    #[serde(default)]
    pub code_shared: Vec<NodeId>,
    #[serde(default)]
    pub semantic: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staleness {
    pub source_hash: String,
    pub is_stale: bool,
    pub last_verified: chrono::DateTime<chrono::Utc>,
}

/// One per tree node (spec.md §3, Doc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doc {
    pub node_id: NodeId,
    pub title: String,
    pub scale: Scale,
    pub description: String,
    pub what_it_does: String,
    pub owned_files: Vec<String>,
    pub entry_points: Vec<String>,
    pub key_concepts: Vec<String>,
    pub cross_refs: CrossRefs,
    pub staleness: Staleness,
    pub content_hash: String,
    pub object_cid: Option<String>,
}

/// Free-form tree metadata loaded alongside nodes (`_meta`, `coordination`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeMeta {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Coordination {
    #[serde(default)]
    pub phases: Vec<String>,
}

/// The raw tree document shape (spec.md §6, Tree document).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(rename = "_meta", default)]
    pub meta: TreeMeta,
    #[serde(default)]
    pub coordination: Coordination,
    pub nodes: Vec<Node>,
}

/// An event record emitted for every phase and notable decision (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PtcEvent {
    pub event_type: String,
    pub key: String,
    pub value: serde_json::Value,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl PtcEvent {
    pub fn new(event_type: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            key: key.into(),
            value,
            timestamp: chrono::Utc::now(),
        }
    }
}

pub type Extra = HashMap<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_base_risk_matches_spec() {
        assert_eq!(Scale::Executive.base_risk(), 8);
        assert_eq!(Scale::Department.base_risk(), 6);
        assert_eq!(Scale::Captain.base_risk(), 3);
        assert_eq!(Scale::Module.base_risk(), 2);
        assert_eq!(Scale::Crate.base_risk(), 2);
    }

    #[test]
    fn node_id_from_str_roundtrips_through_json() {
        let id: NodeId = "dept:security".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dept:security\"");
        let back: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn node_is_leaf_iff_no_children() {
        let leaf = Node {
            id: "capt:docker".into(),
            name: "Docker".into(),
            scale: Scale::Captain,
            parent: Some("dept:infra".into()),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: NodeMetadata::default(),
        };
        assert!(leaf.is_leaf());

        let branch = Node {
            children: vec!["capt:docker".into()],
            ..leaf
        };
        assert!(!branch.is_leaf());
    }
}
