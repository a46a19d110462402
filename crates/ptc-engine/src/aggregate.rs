//! INTEGRATE — roll results up from the leaves through the tree, applying
//! each branch node's rules. Grounded on `ptc/engine.py::aggregate`.

use ptc_core::{AggStatus, Aggregated, NodeId, ResultStatus, RuleAction, TaskResult};
use ptc_tree::Tree;
use std::collections::HashMap;

fn leaf_status(status: ResultStatus) -> AggStatus {
    match status {
        ResultStatus::Completed | ResultStatus::Planned => AggStatus::Completed,
        ResultStatus::Failed => AggStatus::Failed,
        ResultStatus::Blocked => AggStatus::Blocked,
        ResultStatus::Escalated => AggStatus::Escalated,
        ResultStatus::Pending | ResultStatus::Executing => AggStatus::InProgress,
    }
}

fn aggregate_node(tree: &Tree, nid: &NodeId, result_map: &HashMap<&NodeId, &TaskResult>) -> Option<Aggregated> {
    let node = tree.node(nid)?;

    if node.is_leaf() {
        let result = result_map.get(nid)?;
        let status = leaf_status(result.status);
        return Some(Aggregated {
            node_id: nid.clone(),
            status,
            completed: (status == AggStatus::Completed) as u32,
            failed: (status == AggStatus::Failed) as u32,
            children_results: Vec::new(),
            escalation_target: None,
        });
    }

    let child_results: Vec<Aggregated> = node.children.iter().filter_map(|c| aggregate_node(tree, c, result_map)).collect();
    if child_results.is_empty() {
        return None;
    }

    let mut blocked = false;
    let mut escalated = false;
    for rule in &node.rules {
        match rule.action {
            RuleAction::Block => {
                if child_results.iter().any(|r| r.status == AggStatus::Failed) {
                    blocked = true;
                }
            }
            RuleAction::Escalate => {
                if child_results.iter().any(|r| r.status == AggStatus::Failed) {
                    escalated = true;
                }
            }
            _ => {}
        }
    }

    let completed = child_results.iter().filter(|r| r.status == AggStatus::Completed).count() as u32;
    let failed = child_results.iter().filter(|r| r.status == AggStatus::Failed).count() as u32;

    let mut status = if child_results.iter().all(|r| r.status == AggStatus::Completed) {
        AggStatus::Completed
    } else if child_results.iter().any(|r| r.status == AggStatus::Failed) {
        if child_results.iter().any(|r| r.status == AggStatus::Completed) {
            AggStatus::Partial
        } else {
            AggStatus::Failed
        }
    } else {
        AggStatus::InProgress
    };

    if blocked {
        status = AggStatus::Blocked;
    }
    if escalated {
        status = AggStatus::Escalated;
    }

    let escalation_target = if escalated { node.escalation.target_id.clone() } else { None };

    Some(Aggregated { node_id: nid.clone(), status, completed, failed, children_results: child_results, escalation_target })
}

/// Roll results up from `target` (or the tree root) down to the leaves that
/// actually ran. Returns `None` only when `target` itself has no reachable
/// result (e.g. the whole subtree was skipped) — the caller treats an empty
/// `results` slice as its own "no results" case before calling this.
pub fn aggregate(tree: &Tree, results: &[TaskResult], target: Option<&NodeId>) -> Option<Aggregated> {
    let result_map: HashMap<&NodeId, &TaskResult> = results.iter().map(|r| (&r.node_id, r)).collect();
    let target_id = target.cloned().unwrap_or_else(|| tree.root().clone());
    aggregate_node(tree, &target_id, &result_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ptc_core::{Escalation, Node, NodeMetadata, Rule, Scale, TreeDocument};

    fn tree_with_rule(action: RuleAction) -> Tree {
        let root = Node {
            id: NodeId::from("root:ptc"),
            name: "PTC".into(),
            scale: Scale::Executive,
            parent: None,
            children: vec![NodeId::from("crate:auth"), NodeId::from("crate:billing")],
            rules: vec![Rule { name: "r".into(), condition: "any_failed".into(), action }],
            escalation: Escalation { target_id: Some(NodeId::from("exec:cto")), threshold: None, cascade: vec![] },
            metadata: NodeMetadata::default(),
        };
        let auth = Node {
            id: NodeId::from("crate:auth"),
            name: "auth".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("root:ptc")),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        let billing = Node {
            id: NodeId::from("crate:billing"),
            name: "billing".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("root:ptc")),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        Tree::from_document(TreeDocument { meta: Default::default(), coordination: Default::default(), nodes: vec![root, auth, billing] }).unwrap()
    }

    fn result(node_id: &str, status: ResultStatus) -> TaskResult {
        TaskResult {
            node_id: NodeId::from(node_id),
            node_name: node_id.into(),
            scale: Scale::Crate,
            intent: "do it".into(),
            lineage: vec![],
            status,
            started_at: Utc::now(),
            completed_at: None,
            output: serde_json::json!({}),
            artifacts: vec![],
            error: None,
            escalated_to: None,
            escalation_reason: None,
        }
    }

    #[test]
    fn all_completed_children_roll_up_to_completed() {
        let t = tree_with_rule(RuleAction::Pass);
        let results = vec![result("crate:auth", ResultStatus::Completed), result("crate:billing", ResultStatus::Completed)];
        let agg = aggregate(&t, &results, None).unwrap();
        assert_eq!(agg.status, AggStatus::Completed);
        assert_eq!(agg.completed, 2);
    }

    #[test]
    fn a_block_rule_escalates_a_failure_to_blocked() {
        let t = tree_with_rule(RuleAction::Block);
        let results = vec![result("crate:auth", ResultStatus::Completed), result("crate:billing", ResultStatus::Failed)];
        let agg = aggregate(&t, &results, None).unwrap();
        assert_eq!(agg.status, AggStatus::Blocked);
    }

    #[test]
    fn an_escalate_rule_records_the_target_on_failure() {
        let t = tree_with_rule(RuleAction::Escalate);
        let results = vec![result("crate:auth", ResultStatus::Failed), result("crate:billing", ResultStatus::Completed)];
        let agg = aggregate(&t, &results, None).unwrap();
        assert_eq!(agg.status, AggStatus::Escalated);
        assert_eq!(agg.escalation_target, Some(NodeId::from("exec:cto")));
    }

    #[test]
    fn mixed_without_rules_is_partial() {
        let t = tree_with_rule(RuleAction::Pass);
        let results = vec![result("crate:auth", ResultStatus::Failed), result("crate:billing", ResultStatus::Completed)];
        let agg = aggregate(&t, &results, None).unwrap();
        assert_eq!(agg.status, AggStatus::Partial);
    }
}
