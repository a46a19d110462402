//! Blueprint generation: id/name derivation and context inference.
//! Grounded on `ptc/architect.py::_generate_id/_intent_to_name/_infer_*`.

use crate::cache::hash_intent;
use ptc_core::{NodeId, Rule, RuleAction};
use std::collections::BTreeSet;

/// Context supplied by the caller of `create_blueprint` — the loose
/// `context` dict in the original, typed here as what it actually carries.
#[derive(Debug, Clone, Default)]
pub struct BlueprintContext {
    pub node_id: Option<NodeId>,
    pub files: Vec<String>,
    pub rules: Vec<Rule>,
    pub lineage: Vec<NodeId>,
    pub project: Option<String>,
}

pub fn generate_id(intent: &str) -> String {
    let words: Vec<String> = intent
        .to_lowercase()
        .split_whitespace()
        .take(6)
        .filter(|w| w.chars().all(|c| c.is_alphanumeric()) || *w == "-")
        .map(|w| w.to_string())
        .collect();
    let slug = if words.is_empty() { "blueprint".to_string() } else { words.join("-") };
    let hash = hash_intent(intent);
    let suffix: String = hash.trim_start_matches("sha256:").chars().take(6).collect();
    format!("blueprint:{slug}-{suffix}")
}

pub fn intent_to_name(intent: &str) -> String {
    let lowered = intent.trim().to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn infer_modules(ctx: &BlueprintContext) -> Vec<String> {
    let mut modules = BTreeSet::new();
    for f in &ctx.files {
        if let Some((head, _rest)) = f.split_once('/') {
            modules.insert(head.to_string());
        }
    }
    modules.into_iter().collect()
}

pub fn infer_patterns(ctx: &BlueprintContext) -> Vec<String> {
    ctx.rules
        .iter()
        .filter_map(|r| match r.action {
            RuleAction::Log => Some("fire-and-forget".to_string()),
            RuleAction::Block => Some("gate".to_string()),
            RuleAction::Escalate => Some("escalation".to_string()),
            _ => None,
        })
        .collect()
}

pub fn infer_interconnections(ctx: &BlueprintContext) -> Vec<NodeId> {
    ctx.node_id.clone().into_iter().collect()
}
