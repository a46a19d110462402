//! Tree Model — load a tree document, answer graph queries over it.
//!
//! A run treats the tree as read-only for its duration; no method here
//! mutates a loaded [`Tree`].

use ptc_core::{Error, Node, NodeId, Result, TreeDocument, TreeMeta};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    pub meta: TreeMeta,
    pub coordination: ptc_core::Coordination,
}

impl Tree {
    /// Parse and validate a [`TreeDocument`]. Exactly one node may have no
    /// parent, and every parent/child reference must resolve to a node in
    /// the same document — violations are a hard `Error::InvalidTree`.
    pub fn from_document(doc: TreeDocument) -> Result<Self> {
        let nodes: HashMap<NodeId, Node> = doc.nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let roots: Vec<&NodeId> = nodes.values().filter(|n| n.parent.is_none()).map(|n| &n.id).collect();
        let root = match roots.as_slice() {
            [single] => (*single).clone(),
            [] => return Err(Error::invalid_tree("no root node (every node has a parent)")),
            _ => return Err(Error::invalid_tree(format!("multiple root nodes: {:?}", roots))),
        };

        for node in nodes.values() {
            if let Some(parent) = &node.parent {
                if !nodes.contains_key(parent) {
                    return Err(Error::invalid_tree(format!("node {} references missing parent {}", node.id, parent)));
                }
            }
            for child in &node.children {
                if !nodes.contains_key(child) {
                    return Err(Error::invalid_tree(format!("node {} references missing child {}", node.id, child)));
                }
            }
        }

        Ok(Self { nodes, root, meta: doc.meta, coordination: doc.coordination })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let doc: TreeDocument = serde_json::from_str(&contents)?;
        Self::from_document(doc)
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root-to-node path, inclusive of both ends. Recomputed on demand,
    /// never cached on the node.
    pub fn lineage(&self, id: &NodeId) -> Result<Vec<NodeId>> {
        let mut lineage = Vec::new();
        let mut current = Some(id.clone());
        while let Some(nid) = current {
            let node = self.nodes.get(&nid).ok_or_else(|| Error::node_not_found(nid.as_str()))?;
            lineage.push(nid);
            current = node.parent.clone();
        }
        lineage.reverse();
        Ok(lineage)
    }

    /// Leaf ids under `from` (root if `None`), depth-first.
    pub fn leaves(&self, from: Option<&NodeId>) -> Vec<NodeId> {
        let start = from.cloned().unwrap_or_else(|| self.root.clone());
        let mut leaves = Vec::new();
        self.walk_leaves(&start, &mut leaves);
        leaves
    }

    fn walk_leaves(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(id) else { return };
        if node.children.is_empty() {
            out.push(id.clone());
        } else {
            for child in &node.children {
                self.walk_leaves(child, out);
            }
        }
    }

    pub fn siblings(&self, id: &NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else { return Vec::new() };
        let Some(parent_id) = &node.parent else { return Vec::new() };
        let Some(parent) = self.nodes.get(parent_id) else { return Vec::new() };
        parent.children.iter().filter(|c| *c != id).cloned().collect()
    }
}
