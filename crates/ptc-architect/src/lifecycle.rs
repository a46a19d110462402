//! `verify` and the merge logic behind `update` — grounded on
//! `ptc/architect.py::verify_blueprint` and `update_blueprint`.

use ptc_core::{Blueprint, BlueprintStatus, ResultStatus, TaskResult};
use serde_json::Value;

pub fn verify(blueprint: &mut Blueprint, results: &[TaskResult]) {
    let completed = results.iter().filter(|r| r.status == ResultStatus::Completed).count() as u32;
    let failed = results.iter().filter(|r| r.status == ResultStatus::Failed).count() as u32;
    let total = results.len() as u32;

    blueprint.execution.completed = completed;
    blueprint.execution.failed = failed;
    blueprint.execution.in_flight = total.saturating_sub(completed + failed);

    blueprint.status = if failed > 0 {
        BlueprintStatus::Failed
    } else if total > 0 && completed == total {
        BlueprintStatus::Verified
    } else {
        BlueprintStatus::Building
    };
}

/// Merge `updates` onto `existing`, one level deep: objects merge key by
/// key, arrays extend, everything else overwrites. Matches the original's
/// `dict.update` / `list.extend` / assignment trio.
pub fn merge_into(existing: &mut Value, updates: Value) {
    let Value::Object(update_map) = updates else { return };
    let Value::Object(existing_map) = existing else { return };

    for (key, value) in update_map {
        match (existing_map.get_mut(&key), value) {
            (Some(Value::Object(existing_obj)), Value::Object(value_obj)) => {
                for (k, v) in value_obj {
                    existing_obj.insert(k, v);
                }
            }
            (Some(Value::Array(existing_arr)), Value::Array(mut value_arr)) => {
                existing_arr.append(&mut value_arr);
            }
            (_, value) => {
                existing_map.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ptc_core::{BlueprintContent, BlueprintExecution, NodeId, Scale};
    use serde_json::json;

    fn result(status: ResultStatus) -> TaskResult {
        TaskResult {
            node_id: NodeId::from("crate:ptc-core"),
            node_name: "ptc-core".into(),
            scale: Scale::Crate,
            intent: "do it".into(),
            lineage: vec![],
            status,
            started_at: Utc::now(),
            completed_at: None,
            output: json!({}),
            artifacts: vec![],
            error: None,
            escalated_to: None,
            escalation_reason: None,
        }
    }

    fn bp() -> Blueprint {
        Blueprint {
            id: "blueprint:x-abc123".into(),
            name: "X".into(),
            content: BlueprintContent::default(),
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
    fn all_completed_marks_verified() {
        let mut b = bp();
        verify(&mut b, &[result(ResultStatus::Completed), result(ResultStatus::Completed)]);
        assert_eq!(b.status, BlueprintStatus::Verified);
        assert_eq!(b.execution.completed, 2);
    }

    #[test]
    fn any_failure_marks_failed() {
        let mut b = bp();
        verify(&mut b, &[result(ResultStatus::Completed), result(ResultStatus::Failed)]);
        assert_eq!(b.status, BlueprintStatus::Failed);
        assert_eq!(b.execution.failed, 1);
    }

    #[test]
    fn partial_completion_marks_building() {
        let mut b = bp();
        verify(&mut b, &[result(ResultStatus::Completed), result(ResultStatus::Executing)]);
        assert_eq!(b.status, BlueprintStatus::Building);
        assert_eq!(b.execution.in_flight, 1);
    }

    #[test]
    fn merge_into_merges_objects_extends_arrays_overwrites_scalars() {
        let mut existing = json!({"how": {"approach": "old"}, "interconnections": ["a"], "what": "old"});
        merge_into(&mut existing, json!({"how": {"patterns": ["gate"]}, "interconnections": ["b"], "what": "new"}));
        assert_eq!(existing["how"]["approach"], "old");
        assert_eq!(existing["how"]["patterns"], json!(["gate"]));
        assert_eq!(existing["interconnections"], json!(["a", "b"]));
        assert_eq!(existing["what"], "new");
    }
}
