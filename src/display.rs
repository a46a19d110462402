//! Human-readable rendering for `show-tree`, `show-leaves`, and a PTC
//! trace. Grounded on `ptc/engine.py::_show_tree`/`display_trace`/
//! `_display_agg`; `--json` bypasses all of this in favor of
//! `serde_json::to_string_pretty`.

use ptc_core::{AggStatus, Aggregated, NodeId, ResultStatus, Trace};
use ptc_tree::Tree;

pub fn show_tree(tree: &Tree) {
    println!("Tree: {}", tree.meta.title);
    println!("Nodes: {}", tree.len());
    println!("Root: {}", tree.root().as_str());
    println!();
    print_node(tree, tree.root(), 0);
}

fn print_node(tree: &Tree, id: &NodeId, depth: usize) {
    let Some(node) = tree.node(id) else { return };
    let indent = "  ".repeat(depth);
    let leaf_mark = if node.is_leaf() { " *" } else { "" };
    println!("{indent}├── {} [{:?}]{leaf_mark}", node.name, node.scale);
    for child in &node.children {
        print_node(tree, child, depth + 1);
    }
}

pub fn show_leaves(tree: &Tree) {
    let leaves = tree.leaves(None);
    println!("Leaf nodes ({}):", leaves.len());
    for leaf_id in &leaves {
        let Some(node) = tree.node(leaf_id) else { continue };
        let lineage = tree.lineage(leaf_id).unwrap_or_default();
        let lineage_str = lineage.iter().map(NodeId::as_str).collect::<Vec<_>>().join(" → ");
        println!("  {:<24} {:<28} {lineage_str}", node.name, leaf_id.as_str());
    }
}

fn result_icon(status: ResultStatus) -> &'static str {
    match status {
        ResultStatus::Completed => "+",
        ResultStatus::Planned => "~",
        ResultStatus::Failed => "!",
        ResultStatus::Executing => ">",
        ResultStatus::Blocked => "X",
        ResultStatus::Escalated => "^",
        ResultStatus::Pending => "?",
    }
}

fn agg_icon(status: AggStatus) -> &'static str {
    match status {
        AggStatus::Completed => "+",
        AggStatus::Partial => "~",
        AggStatus::Failed => "!",
        AggStatus::Blocked => "X",
        AggStatus::Escalated => "^",
        AggStatus::InProgress => "?",
    }
}

fn display_agg(agg: &Aggregated, depth: usize) {
    let indent = "  ".repeat(depth);
    if agg.children_results.is_empty() {
        println!("{indent}[{}] {} — {:?}", agg_icon(agg.status), agg.node_id.as_str(), agg.status);
        return;
    }
    let total = agg.children_results.len();
    println!("{indent}[{}] {} — {}/{total} children completed", agg_icon(agg.status), agg.node_id.as_str(), agg.completed);
    if let Some(target) = &agg.escalation_target {
        println!("{indent}    ^ ESCALATED to {}", target.as_str());
    }
    for child in &agg.children_results {
        display_agg(child, depth + 1);
    }
}

pub fn display_trace(trace: &Trace, verbose: bool) {
    println!("PTC RUN: {}", trace.run_id);
    println!("{}", "=".repeat(60));
    println!("Intent:  {}", trace.intent);
    println!("Tree:    {}", trace.tree_title);
    println!("Mode:    {}", if trace.dry_run { "DRY RUN" } else { "LIVE" });
    println!("Phases:  {}", trace.phases_used.join(" → "));
    println!();

    println!("DECOMPOSITION: {} leaf tasks", trace.tasks_decomposed);
    println!("{}", "─".repeat(60));
    for r in &trace.leaf_results {
        let lineage = r.lineage.iter().map(NodeId::as_str).collect::<Vec<_>>().join(" → ");
        println!("  [{}] {} ({})", result_icon(r.status), r.node_name, r.node_id.as_str());
        println!("      Task: {}", r.intent);
        if !lineage.is_empty() {
            println!("      Lineage: {lineage}");
        }
        if verbose {
            if let Some(obj) = r.output.as_object() {
                for (k, v) in obj {
                    println!("      {k}: {v}");
                }
            }
        }
        println!();
    }

    if let Some(agg) = &trace.aggregated {
        println!("AGGREGATION");
        println!("{}", "─".repeat(60));
        display_agg(agg, 0);
        println!();
    }

    println!("SUMMARY");
    println!("{}", "─".repeat(60));
    println!("  Tasks:     {} decomposed, {} executed", trace.tasks_decomposed, trace.tasks_executed);
    println!("  Completed: {}", trace.tasks_completed);
    println!("  Failed:    {}", trace.tasks_failed);
    println!("  Blocked:   {}", trace.tasks_blocked);
    println!("  Duration:  {}ms", trace.duration_ms);
}
