//! `validate` — check a blueprint against the schema and (optionally) the
//! tree. Grounded on `ptc/architect.py::validate_blueprint`.

use ptc_core::Blueprint;
use ptc_tree::Tree;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate(blueprint: &Blueprint, tree: Option<&Tree>, root: impl AsRef<Path>) -> ValidationResult {
    let root = root.as_ref();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if blueprint.content.what.trim().is_empty() {
        errors.push("missing 'what' — describe what this builds".to_string());
    }
    if blueprint.content.builder_tasks.is_empty() {
        warnings.push("no builder_tasks — this blueprint has nothing to build".to_string());
    }
    if blueprint.content.acceptance.criteria.is_empty() {
        warnings.push("no acceptance criteria — how do we know it's done?".to_string());
    }

    for bt in &blueprint.content.builder_tasks {
        if let Some(tree) = tree {
            if tree.node(&bt.target_node).is_none() {
                errors.push(format!("task {}: target node '{}' not found in tree", bt.task_id, bt.target_node));
            }
        }
        for f in &bt.files {
            if !root.join(f).exists() && !bt.intent.to_lowercase().contains("create") {
                warnings.push(format!("task {}: file '{}' does not exist (will be created?)", bt.task_id, f));
            }
        }
    }

    ValidationResult { valid: errors.is_empty(), errors, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ptc_core::{BlueprintContent, BlueprintExecution, BlueprintStatus, BuilderTask, NodeId};

    fn bp(what: &str, tasks: Vec<BuilderTask>) -> Blueprint {
        Blueprint {
            id: "blueprint:x-abc123".into(),
            name: "X".into(),
            content: BlueprintContent { what: what.into(), builder_tasks: tasks, ..Default::default() },
            content_hash: "sha256:x".into(),
            intent_hash: "sha256:y".into(),
            status: BlueprintStatus::Draft,
            blueprint_version: 1,
            cached: false,
            project: "ptc".into(),
            created_at: Utc::now(),
            execution: BlueprintExecution::default(),
            children: vec![],
        }
    }

    #[test]
    fn missing_what_is_an_error() {
        let result = validate(&bp("", vec![]), None, ".");
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("missing 'what'")));
    }

    #[test]
    fn empty_builder_tasks_is_only_a_warning() {
        let result = validate(&bp("add webhooks", vec![]), None, ".");
        assert!(result.valid);
        assert!(result.warnings.iter().any(|w| w.contains("builder_tasks")));
    }

    #[test]
    fn missing_file_without_create_intent_is_a_warning() {
        let tasks = vec![BuilderTask {
            task_id: "task-1".into(),
            target_node: NodeId::from("crate:ptc-core"),
            intent: "update webhook handling".into(),
            files: vec!["does/not/exist.rs".into()],
            acceptance: None,
            depends_on: vec![],
        }];
        let result = validate(&bp("add webhooks", tasks), None, ".");
        assert!(result.warnings.iter().any(|w| w.contains("does not exist")));
    }

    #[test]
    fn missing_file_with_create_intent_is_not_flagged() {
        let tasks = vec![BuilderTask {
            task_id: "task-1".into(),
            target_node: NodeId::from("crate:ptc-core"),
            intent: "create a webhook module".into(),
            files: vec!["does/not/exist.rs".into()],
            acceptance: None,
            depends_on: vec![],
        }];
        let result = validate(&bp("add webhooks", tasks), None, ".");
        assert!(result.warnings.is_empty());
    }
}
