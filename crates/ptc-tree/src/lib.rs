//! Tree Model and Docs Graph: load/validate the coordination tree, answer
//! lineage/leaf queries over it, and generate cross-referenced per-node docs.

pub mod docs;
pub mod model;

pub use docs::{
    build_cross_refs, check_all_stale, check_staleness, compute_code_refs, compute_file_hash,
    compute_semantic_refs, compute_structural_refs, full_interconnect, generate_all, generate_doc,
    make_bidirectional, propagate_staleness, EdgeKind, Graph, GraphEdge,
};
pub use model::Tree;
