//! `blueprint_to_tasks` — turn a blueprint's builder_tasks into PTC tasks,
//! grounded on `ptc/architect.py::blueprint_to_tasks`. Pure and synchronous:
//! it populates `blueprint.children` as a side effect, the same way the
//! Tree Model stays load/query-scoped rather than reaching for I/O.

use ptc_core::{Blueprint, Escalation, NodeId, Scale, Task};

pub fn blueprint_to_tasks(blueprint: &mut Blueprint) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(blueprint.content.builder_tasks.len());
    let mut children = Vec::with_capacity(blueprint.content.builder_tasks.len());

    for bt in &blueprint.content.builder_tasks {
        children.push(bt.task_id.clone());
        tasks.push(Task {
            node_id: bt.target_node.clone(),
            node_name: bt.task_id.clone(),
            scale: Scale::Captain,
            intent: bt.intent.clone(),
            lineage: vec![NodeId::from(blueprint.id.as_str()), bt.target_node.clone()],
            files: bt.files.clone(),
            functions: Vec::new(),
            rules: Vec::new(),
            escalation: Escalation::default(),
            codie_program: None,
            blueprint_id: Some(blueprint.id.clone()),
            task_id: Some(bt.task_id.clone()),
            acceptance: bt.acceptance.clone(),
            depends_on: bt.depends_on.clone(),
        });
    }

    blueprint.children = children;
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ptc_core::{BlueprintAcceptance, BlueprintContent, BlueprintExecution, BlueprintStatus, BuilderTask};

    fn sample_blueprint() -> Blueprint {
        Blueprint {
            id: "blueprint:add-webhooks-abc123".into(),
            name: "Add webhooks".into(),
            content: BlueprintContent {
                what: "add webhook support".into(),
                builder_tasks: vec![
                    BuilderTask {
                        task_id: "task-1".into(),
                        target_node: NodeId::from("crate:ptc-core"),
                        intent: "add Webhook type".into(),
                        files: vec!["src/webhook.rs".into()],
                        acceptance: None,
                        depends_on: vec![],
                    },
                    BuilderTask {
                        task_id: "task-2".into(),
                        target_node: NodeId::from("crate:ptc-engine"),
                        intent: "wire webhook dispatch".into(),
                        files: vec![],
                        acceptance: None,
                        depends_on: vec!["task-1".into()],
                    },
                ],
                acceptance: BlueprintAcceptance::default(),
                ..Default::default()
            },
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
    fn converts_builder_tasks_and_sets_blueprint_children() {
        let mut bp = sample_blueprint();
        let tasks = blueprint_to_tasks(&mut bp);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].depends_on, vec!["task-1".to_string()]);
        assert_eq!(bp.children, vec!["task-1".to_string(), "task-2".to_string()]);
        assert_eq!(tasks[0].blueprint_id.as_deref(), Some(bp.id.as_str()));
    }
}
