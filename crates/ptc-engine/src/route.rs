//! TRIAGE — score every node against an intent by token overlap.
//! Grounded on `ptc/engine.py::route_intent`.

use ptc_core::NodeId;
use ptc_tree::Tree;

/// Ranked `(score, node_id)` pairs, descending by score then ascending by
/// id — ties broken the same deterministic way as the original's
/// `sort(key=lambda x: (-x[0], x[1]))`.
pub fn route_intent(tree: &Tree, intent: &str) -> Vec<(f64, NodeId)> {
    let words: Vec<String> = intent.to_lowercase().split_whitespace().map(str::to_string).collect();
    let mut matches: Vec<(f64, NodeId)> = Vec::new();

    for node in tree.nodes() {
        let text = format!(
            "{} {} {} {} {}",
            node.name,
            node.id.as_str(),
            node.metadata.crates_owned.join(" "),
            node.metadata.files.join(" "),
            node.metadata.functions.join(" "),
        )
        .to_lowercase();

        let mut score = 0.0;
        for word in &words {
            if text.contains(word.as_str()) {
                score += 1.0;
            }
        }

        if node.is_leaf() && score > 0.0 {
            score += 0.5;
        }

        if score > 0.0 {
            matches.push((score, node.id.clone()));
        }
    }

    matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then_with(|| a.1.as_str().cmp(b.1.as_str())));
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_core::{Node, NodeMetadata, Scale, TreeDocument};

    fn tree() -> Tree {
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
        let leaf = Node {
            id: NodeId::from("crate:auth"),
            name: "auth".into(),
            scale: Scale::Crate,
            parent: Some(NodeId::from("root:ptc")),
            children: vec![],
            rules: vec![],
            escalation: Default::default(),
            metadata: NodeMetadata { files: vec!["auth/login.rs".into()], ..Default::default() },
        };
        Tree::from_document(TreeDocument { meta: Default::default(), coordination: Default::default(), nodes: vec![root, leaf] }).unwrap()
    }

    #[test]
    fn leaf_node_gets_tiebreaker_bonus() {
        let ranked = route_intent(&tree(), "fix the login flow");
        assert_eq!(ranked[0].1, NodeId::from("crate:auth"));
        assert_eq!(ranked[0].0, 1.5);
    }

    #[test]
    fn unmatched_intent_yields_no_matches() {
        assert!(route_intent(&tree(), "xyzzy plugh").is_empty());
    }
}
