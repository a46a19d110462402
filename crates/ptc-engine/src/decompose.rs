//! PLAN — decompose an intent into leaf-level tasks, top-down.
//! Grounded on `ptc/engine.py::decompose`/`_walk_down`.

use ptc_core::{NodeId, Scale, Task};
use ptc_tree::Tree;
use std::collections::HashSet;

fn walk_down(tree: &Tree, nid: &NodeId, intent: &str, tasks: &mut Vec<Task>) {
    let Some(node) = tree.node(nid) else { return };

    if node.is_leaf() {
        let lineage = tree.lineage(nid).unwrap_or_else(|_| vec![nid.clone()]);
        tasks.push(Task {
            node_id: nid.clone(),
            node_name: node.name.clone(),
            scale: node.scale,
            intent: intent.to_string(),
            lineage,
            files: node.metadata.files.clone(),
            functions: node.metadata.functions.clone(),
            rules: node.rules.clone(),
            escalation: node.escalation.clone(),
            codie_program: None,
            blueprint_id: None,
            task_id: None,
            acceptance: None,
            depends_on: vec![],
        });
    } else {
        for child in &node.children {
            walk_down(tree, child, intent, tasks);
        }
    }
}

/// Decompose `intent` into a deduplicated list of leaf tasks. With a
/// `target`, walks down from exactly that node. Without one, fans out
/// across the `route_intent` ranking — skipping executive-scale non-root
/// nodes, taking leaf matches directly, and decomposing branch matches
/// only when none of their children are already targeted.
pub fn decompose(tree: &Tree, intent: &str, target: Option<&NodeId>, ranking: &[(f64, NodeId)]) -> Vec<Task> {
    let mut tasks = Vec::new();

    if let Some(target_id) = target {
        walk_down(tree, target_id, intent, &mut tasks);
    } else {
        let mut seen_subtrees: HashSet<NodeId> = HashSet::new();

        for (_, nid) in ranking {
            let Some(node) = tree.node(nid) else { continue };

            if node.scale == Scale::Executive && node.parent.is_some() {
                continue;
            }

            if node.is_leaf() {
                if seen_subtrees.insert(nid.clone()) {
                    walk_down(tree, nid, intent, &mut tasks);
                }
                continue;
            }

            if !seen_subtrees.contains(nid) {
                let children_targeted = node.children.iter().any(|c| seen_subtrees.contains(c));
                if !children_targeted {
                    seen_subtrees.insert(nid.clone());
                    walk_down(tree, nid, intent, &mut tasks);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    tasks.retain(|t| seen.insert(t.node_id.clone()));
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_core::{Escalation, Node, TreeDocument};

    fn tree() -> Tree {
        let root = Node {
            id: NodeId::from("root:ptc"),
            name: "PTC".into(),
            scale: Scale::Executive,
            parent: None,
            children: vec![NodeId::from("dept:platform")],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        let dept = Node {
            id: NodeId::from("dept:platform"),
            name: "Platform".into(),
            scale: Scale::Department,
            parent: Some(NodeId::from("root:ptc")),
            children: vec![NodeId::from("crate:auth"), NodeId::from("crate:billing")],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        let auth = Node {
            id: NodeId::from("crate:auth"),
            name: "auth".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("dept:platform")),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        let billing = Node {
            id: NodeId::from("crate:billing"),
            name: "billing".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("dept:platform")),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        Tree::from_document(TreeDocument { meta: Default::default(), coordination: Default::default(), nodes: vec![root, dept, auth, billing] }).unwrap()
    }

    #[test]
    fn targeted_decompose_walks_only_that_subtree() {
        let t = tree();
        let tasks = decompose(&t, "fix it", Some(&NodeId::from("dept:platform")), &[]);
        let ids: Vec<&str> = tasks.iter().map(|t| t.node_id.as_str()).collect();
        assert_eq!(ids, vec!["crate:auth", "crate:billing"]);
    }

    #[test]
    fn fan_out_skips_children_already_targeted_by_a_leaf_match() {
        let t = tree();
        let ranking = vec![(1.5, NodeId::from("crate:auth")), (1.0, NodeId::from("dept:platform"))];
        let tasks = decompose(&t, "fix auth", None, &ranking);
        let ids: Vec<&str> = tasks.iter().map(|t| t.node_id.as_str()).collect();
        assert_eq!(ids, vec!["crate:auth", "crate:billing"]);
    }

    #[test]
    fn fan_out_skips_non_root_executive_matches() {
        // A non-root node at executive scale is skipped even if it ranked —
        // only the tree's actual root is allowed that scale in the fan-out.
        let mut t = tree();
        let stray = Node {
            id: NodeId::from("exec:stray"),
            name: "stray".into(),
            scale: Scale::Executive,
            parent: Some(NodeId::from("dept:platform")),
            children: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            metadata: Default::default(),
        };
        t = Tree::from_document(TreeDocument {
            meta: Default::default(),
            coordination: Default::default(),
            nodes: {
                let mut nodes: Vec<Node> = t.nodes().cloned().collect();
                nodes.iter_mut().find(|n| n.id == NodeId::from("dept:platform")).unwrap().children.push(stray.id.clone());
                nodes.push(stray);
                nodes
            },
        })
        .unwrap();

        let ranking = vec![(1.0, NodeId::from("exec:stray"))];
        assert!(decompose(&t, "anything", None, &ranking).is_empty());
    }
}
