//! Risk scoring and the approval gate. Grounded on
//! `ptc/executor.py::_calculate_risk`/`_check_approval`.

use ptc_core::event::APPROVAL_CHECK;
use ptc_core::{EventBus, NodeId, PtcEvent, Task};

const HIGH_RISK_WORDS: &[&str] = &["delete", "destroy", "drop", "force", "reset", "remove", "wipe", "nuke", "nixos-rebuild"];
const MEDIUM_RISK_WORDS: &[&str] = &["deploy", "push", "release", "migrate", "update", "modify", "nix build", "rebuild tier"];
const SENSITIVE_PATHS: &[&str] = &["security/", "docker/", ".env", "credentials", "config/"];

pub fn score_risk(task: &Task) -> i32 {
    let intent = task.intent.to_lowercase();

    // nixos-rebuild always forces human approval regardless of scale —
    // a rebuild sub-mode has no "low-risk" variant.
    if intent.contains("nixos-rebuild") {
        return 9;
    }

    let mut risk = task.scale.base_risk();

    if HIGH_RISK_WORDS.iter().any(|w| intent.contains(w)) {
        risk += 3;
    }
    if MEDIUM_RISK_WORDS.iter().any(|w| intent.contains(w)) {
        risk += 1;
    }
    if task.files.iter().any(|f| SENSITIVE_PATHS.iter().any(|p| f.contains(p))) {
        risk += 1;
    }
    if task.rules.len() > 3 {
        risk -= 1;
    }

    risk.clamp(1, 10)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalLevel {
    Human,
    Cto,
    Director,
    Captain,
}

#[derive(Debug, Clone)]
pub struct ApprovalDecision {
    pub risk: i32,
    pub blocked: bool,
    pub reason: String,
    pub escalated_to: Option<NodeId>,
    pub level: ApprovalLevel,
}

/// Score risk, gate on threshold, and fire-and-forget the decision onto
/// the event bus — `{node_id, risk, threshold, approved, scale}`.
pub fn check_approval(task: &Task, events: &EventBus) -> ApprovalDecision {
    let risk = score_risk(task);
    let threshold = task.escalation.threshold.unwrap_or(10);

    events.emit(PtcEvent::new(
        APPROVAL_CHECK,
        task.node_id.as_str(),
        serde_json::json!({
            "node_id": task.node_id.as_str(),
            "risk": risk,
            "threshold": threshold,
            "approved": risk < 7,
            "scale": task.scale,
        }),
    ));

    if risk >= 9 {
        ApprovalDecision {
            risk,
            blocked: true,
            reason: format!("risk {risk} requires human approval"),
            escalated_to: Some(NodeId::from("root:human")),
            level: ApprovalLevel::Human,
        }
    } else if risk >= 7 {
        let escalated_to = task.escalation.target_id.clone().unwrap_or_else(|| NodeId::from("exec:cto"));
        ApprovalDecision {
            risk,
            blocked: true,
            reason: format!("risk {risk} requires CTO approval (threshold: {threshold})"),
            escalated_to: Some(escalated_to),
            level: ApprovalLevel::Cto,
        }
    } else if risk >= 4 {
        ApprovalDecision {
            risk,
            blocked: false,
            reason: format!("risk {risk} — logged, proceeding (director-level)"),
            escalated_to: None,
            level: ApprovalLevel::Director,
        }
    } else {
        ApprovalDecision { risk, blocked: false, reason: "auto-approved".to_string(), escalated_to: None, level: ApprovalLevel::Captain }
    }
}
