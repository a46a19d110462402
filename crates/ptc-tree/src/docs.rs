//! Docs Graph — per-node documentation, cross-references, staleness.

use crate::model::Tree;
use chrono::Utc;
use ptc_core::{CrossRefs, Doc, Node, NodeId, Scale, Staleness};
use std::collections::{HashMap, HashSet};
use std::path::Path;

const SEMANTIC_THRESHOLD: f32 = 0.7;

/// sha256 of the sorted, concatenated contents of `paths`, relative to `root`.
/// Missing files contribute nothing; an entirely-missing or empty file set
/// hashes to a fixed sentinel so staleness checks stay stable.
pub fn compute_file_hash(paths: &[String], root: &Path) -> String {
    let mut sorted: Vec<&String> = paths.iter().collect();
    sorted.sort();
    let mut combined = String::new();
    for path in sorted {
        if let Ok(contents) = std::fs::read_to_string(root.join(path)) {
            combined.push_str(&contents);
        }
    }
    if combined.is_empty() {
        "sha256:empty".to_string()
    } else {
        ptc_store::content_hash(&combined)
    }
}

fn node_description(node: &Node) -> String {
    format!("{} ({:?} scale)", node.name, node.scale)
}

fn node_entry_points(node: &Node) -> Vec<String> {
    node.metadata.functions.clone()
}

/// Structural refs: parent, children, siblings.
pub fn compute_structural_refs(tree: &Tree, id: &NodeId) -> Vec<NodeId> {
    let mut refs = HashSet::new();
    if let Some(node) = tree.node(id) {
        if let Some(parent) = &node.parent {
            refs.insert(parent.clone());
        }
        for child in &node.children {
            refs.insert(child.clone());
        }
    }
    for sibling in tree.siblings(id) {
        refs.insert(sibling);
    }
    refs.into_iter().collect()
}

/// Code-shared refs: other nodes that own at least one file or crate this
/// node also owns.
pub fn compute_code_refs(tree: &Tree, id: &NodeId) -> Vec<NodeId> {
    let Some(node) = tree.node(id) else { return Vec::new() };
    let files: HashSet<&String> = node.metadata.files.iter().collect();
    let crates: HashSet<&String> = node.metadata.crates_owned.iter().collect();
    if files.is_empty() && crates.is_empty() {
        return Vec::new();
    }
    tree.nodes()
        .filter(|other| &other.id != id)
        .filter(|other| {
            other.metadata.files.iter().any(|f| files.contains(f))
                || other.metadata.crates_owned.iter().any(|c| crates.contains(c))
        })
        .map(|other| other.id.clone())
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Semantic refs: other nodes whose embedding is above [`SEMANTIC_THRESHOLD`]
/// similarity. `embeddings` is supplied by the caller (ptc-engine, which
/// already depends on ptc-embed) so this crate stays synchronous.
pub fn compute_semantic_refs(id: &NodeId, embeddings: &HashMap<NodeId, Vec<f32>>) -> Vec<NodeId> {
    let Some(this) = embeddings.get(id) else { return Vec::new() };
    embeddings
        .iter()
        .filter(|(other_id, _)| *other_id != id)
        .filter(|(_, vec)| cosine_similarity(this, vec) > SEMANTIC_THRESHOLD)
        .map(|(other_id, _)| other_id.clone())
        .collect()
}

pub fn build_cross_refs(tree: &Tree, id: &NodeId, embeddings: &HashMap<NodeId, Vec<f32>>) -> CrossRefs {
    CrossRefs {
        structural: compute_structural_refs(tree, id),
        code_shared: compute_code_refs(tree, id),
        semantic: compute_semantic_refs(id, embeddings),
    }
}

pub fn generate_doc(tree: &Tree, node: &Node, root: &Path, embeddings: &HashMap<NodeId, Vec<f32>>) -> Doc {
    let source_hash = compute_file_hash(&node.metadata.files, root);
    Doc {
        node_id: node.id.clone(),
        title: node.name.clone(),
        scale: node.scale,
        description: node_description(node),
        what_it_does: node_description(node),
        owned_files: node.metadata.files.clone(),
        entry_points: node_entry_points(node),
        key_concepts: node.metadata.crates_owned.clone(),
        cross_refs: build_cross_refs(tree, &node.id, embeddings),
        staleness: Staleness { source_hash: source_hash.clone(), is_stale: false, last_verified: Utc::now() },
        content_hash: source_hash,
        object_cid: None,
    }
}

pub fn generate_all(tree: &Tree, root: &Path, embeddings: &HashMap<NodeId, Vec<f32>>) -> Vec<Doc> {
    tree.nodes().map(|node| generate_doc(tree, node, root, embeddings)).collect()
}

/// Relation kind on a [`GraphEdge`]. Only `Structural` edges are reciprocal
/// by construction (parent<->child); `CodeShared` and `Semantic` are
/// inherently symmetric already.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Structural,
    CodeShared,
    Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

/// Whole-tree cross-reference view, richer than the per-doc [`CrossRefs`]
/// lists — kept local to this crate rather than folded into `ptc_core::Doc`.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub edges: Vec<GraphEdge>,
}

/// Build the full edge set for every node and make it bidirectional.
pub fn full_interconnect(tree: &Tree, embeddings: &HashMap<NodeId, Vec<f32>>) -> Graph {
    let mut edges = Vec::new();
    for node in tree.nodes() {
        for to in compute_structural_refs(tree, &node.id) {
            edges.push(GraphEdge { from: node.id.clone(), to, kind: EdgeKind::Structural });
        }
        for to in compute_code_refs(tree, &node.id) {
            edges.push(GraphEdge { from: node.id.clone(), to, kind: EdgeKind::CodeShared });
        }
        for to in compute_semantic_refs(&node.id, embeddings) {
            edges.push(GraphEdge { from: node.id.clone(), to, kind: EdgeKind::Semantic });
        }
    }
    make_bidirectional(Graph { edges })
}

/// Add the reverse of every edge, deduped on `(from, to, kind)`. Only
/// `Structural` edges flip what the relation *means* (parent <-> child);
/// the others are already symmetric so the reverse is just a mirrored copy.
pub fn make_bidirectional(graph: Graph) -> Graph {
    let mut seen: HashSet<(NodeId, NodeId, EdgeKind)> = HashSet::new();
    let mut out = Vec::new();
    for edge in &graph.edges {
        let key = (edge.from.clone(), edge.to.clone(), edge.kind);
        if seen.insert(key) {
            out.push(edge.clone());
        }
        let rev_key = (edge.to.clone(), edge.from.clone(), edge.kind);
        if seen.insert(rev_key) {
            out.push(GraphEdge { from: edge.to.clone(), to: edge.from.clone(), kind: edge.kind });
        }
    }
    Graph { edges: out }
}

/// A doc is stale when its recorded `source_hash` no longer matches the
/// current contents of its owned files.
pub fn check_staleness(doc: &Doc, root: &Path) -> bool {
    compute_file_hash(&doc.owned_files, root) != doc.staleness.source_hash
}

pub fn check_all_stale<'a>(docs: &'a [Doc], root: &Path) -> Vec<&'a Doc> {
    docs.iter().filter(|doc| check_staleness(doc, root)).collect()
}

/// Flag every doc reachable from an already-stale doc via graph edges, not
/// just the doc whose files changed — a changed leaf can make its parent's
/// summary stale too.
pub fn propagate_staleness(docs: &mut [Doc], graph: &Graph) {
    let mut frontier: Vec<NodeId> = docs.iter().filter(|d| d.staleness.is_stale).map(|d| d.node_id.clone()).collect();
    let mut visited: HashSet<NodeId> = frontier.iter().cloned().collect();

    while let Some(id) = frontier.pop() {
        for edge in &graph.edges {
            if edge.from == id && visited.insert(edge.to.clone()) {
                frontier.push(edge.to.clone());
            }
        }
    }

    for doc in docs.iter_mut() {
        if visited.contains(&doc.node_id) {
            doc.staleness.is_stale = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tree;
    use ptc_core::{Coordination, Escalation, NodeMetadata, Scale, TreeDocument, TreeMeta};
    use std::io::Write;
    use tempfile::TempDir;

    fn node(id: &str, parent: Option<&str>, children: &[&str], files: &[&str]) -> Node {
        Node {
            id: NodeId::from(id),
            name: id.to_string(),
            scale: Scale::Module,
            parent: parent.map(NodeId::from),
            children: children.iter().map(|c| NodeId::from(*c)).collect(),
            rules: Vec::new(),
            escalation: Escalation::default(),
            metadata: NodeMetadata { files: files.iter().map(|f| f.to_string()).collect(), ..Default::default() },
        }
    }

    fn sample_tree() -> Tree {
        let doc = TreeDocument {
            meta: TreeMeta::default(),
            coordination: Coordination::default(),
            nodes: vec![
                node("root", None, &["a", "b"], &[]),
                node("a", Some("root"), &[], &["a.rs"]),
                node("b", Some("root"), &[], &["b.rs"]),
            ],
        };
        Tree::from_document(doc).unwrap()
    }

    #[test]
    fn compute_file_hash_empty_set_is_sentinel() {
        let dir = TempDir::new().unwrap();
        assert_eq!(compute_file_hash(&[], dir.path()), "sha256:empty");
    }

    #[test]
    fn compute_file_hash_changes_with_content() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.rs");
        std::fs::write(&file, "fn a() {}").unwrap();
        let h1 = compute_file_hash(&["a.rs".to_string()], dir.path());
        std::fs::write(&file, "fn a() { /* changed */ }").unwrap();
        let h2 = compute_file_hash(&["a.rs".to_string()], dir.path());
        assert_ne!(h1, h2);
    }

    #[test]
    fn structural_refs_include_parent_and_siblings() {
        let tree = sample_tree();
        let refs = compute_structural_refs(&tree, &NodeId::from("a"));
        assert!(refs.contains(&NodeId::from("root")));
        assert!(refs.contains(&NodeId::from("b")));
    }

    #[test]
    fn code_refs_empty_when_no_files_owned() {
        let tree = sample_tree();
        let refs = compute_code_refs(&tree, &NodeId::from("root"));
        assert!(refs.is_empty());
    }

    #[test]
    fn semantic_refs_respect_threshold() {
        let mut embeddings = HashMap::new();
        embeddings.insert(NodeId::from("a"), vec![1.0, 0.0]);
        embeddings.insert(NodeId::from("b"), vec![1.0, 0.0]);
        embeddings.insert(NodeId::from("c"), vec![0.0, 1.0]);
        let refs = compute_semantic_refs(&NodeId::from("a"), &embeddings);
        assert_eq!(refs, vec![NodeId::from("b")]);
    }

    #[test]
    fn make_bidirectional_dedups_and_flips_structural() {
        let graph = Graph {
            edges: vec![GraphEdge { from: NodeId::from("a"), to: NodeId::from("root"), kind: EdgeKind::Structural }],
        };
        let bidi = make_bidirectional(graph);
        assert_eq!(bidi.edges.len(), 2);
        assert!(bidi.edges.iter().any(|e| e.from == NodeId::from("root") && e.to == NodeId::from("a")));
    }

    #[test]
    fn check_staleness_detects_changed_files() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("a.rs")).unwrap();
        writeln!(file, "fn a() {{}}").unwrap();
        drop(file);

        let tree = sample_tree();
        let doc = generate_doc(&tree, tree.node(&NodeId::from("a")).unwrap(), dir.path(), &HashMap::new());
        assert!(!check_staleness(&doc, dir.path()));

        std::fs::write(dir.path().join("a.rs"), "fn a() { /* edited */ }").unwrap();
        assert!(check_staleness(&doc, dir.path()));
    }

    #[test]
    fn propagate_staleness_follows_edges() {
        let mut docs = vec![
            Doc {
                node_id: NodeId::from("a"),
                title: "a".into(),
                scale: Scale::Module,
                description: String::new(),
                what_it_does: String::new(),
                owned_files: vec![],
                entry_points: vec![],
                key_concepts: vec![],
                cross_refs: CrossRefs::default(),
                staleness: Staleness { source_hash: "x".into(), is_stale: true, last_verified: Utc::now() },
                content_hash: "x".into(),
                object_cid: None,
            },
            Doc {
                node_id: NodeId::from("root"),
                title: "root".into(),
                scale: Scale::Module,
                description: String::new(),
                what_it_does: String::new(),
                owned_files: vec![],
                entry_points: vec![],
                key_concepts: vec![],
                cross_refs: CrossRefs::default(),
                staleness: Staleness { source_hash: "y".into(), is_stale: false, last_verified: Utc::now() },
                content_hash: "y".into(),
                object_cid: None,
            },
        ];
        let graph = Graph {
            edges: vec![GraphEdge { from: NodeId::from("a"), to: NodeId::from("root"), kind: EdgeKind::Structural }],
        };
        propagate_staleness(&mut docs, &graph);
        assert!(docs[1].staleness.is_stale);
    }
}
