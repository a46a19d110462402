//! Integration tests for ptc-core: types, config loading, error taxonomy, events.

use ptc_core::*;
use serde_json::json;

// ===========================================================================
// NodeId / Scale / Node
// ===========================================================================

#[test]
fn node_id_display_and_as_str() {
    let id = NodeId::from("executive");
    assert_eq!(id.as_str(), "executive");
    assert_eq!(format!("{}", id), "executive");
}

#[test]
fn node_id_equality_and_hash() {
    use std::collections::HashSet;
    let a = NodeId::from("root");
    let b = NodeId::from("root");
    let c = NodeId::from("child");
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = HashSet::new();
    set.insert(a.clone());
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn scale_base_risk_ordering() {
    assert!(Scale::Executive.base_risk() > Scale::Department.base_risk());
    assert!(Scale::Department.base_risk() > Scale::Captain.base_risk());
    assert_eq!(Scale::Module.base_risk(), Scale::Blueprint.base_risk());
}

#[test]
fn scale_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Scale::Executive).unwrap(), r#""executive""#);
    assert_eq!(serde_json::to_string(&Scale::Crate).unwrap(), r#""crate""#);
}

#[test]
fn node_is_leaf_reflects_children() {
    let mut node = Node {
        id: NodeId::from("n1"),
        name: "n1".into(),
        scale: Scale::Module,
        parent: None,
        children: Vec::new(),
        rules: Vec::new(),
        escalation: Escalation::default(),
        metadata: NodeMetadata::default(),
    };
    assert!(node.is_leaf());
    node.children.push(NodeId::from("n2"));
    assert!(!node.is_leaf());
}

// ===========================================================================
// Task / TaskResult roundtrip
// ===========================================================================

#[test]
fn task_serde_roundtrip() {
    let task = Task {
        node_id: NodeId::from("auth-module"),
        node_name: "auth-module".into(),
        scale: Scale::Module,
        intent: "add rate limiting".into(),
        lineage: vec!["executive".into(), "backend".into(), "auth-module".into()],
        files: vec!["src/auth/mod.rs".into()],
        functions: vec![],
        rules: vec![],
        escalation: Escalation::default(),
        codie_program: None,
        blueprint_id: None,
        task_id: "t-1".into(),
        acceptance: vec!["requests are capped".into()],
        depends_on: vec![],
    };
    let json = serde_json::to_string(&task).unwrap();
    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(back.node_id, task.node_id);
    assert_eq!(back.lineage, task.lineage);
}

#[test]
fn task_result_status_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&ResultStatus::Completed).unwrap(), r#""completed""#);
    assert_eq!(serde_json::to_string(&ResultStatus::Blocked).unwrap(), r#""blocked""#);
}

// ===========================================================================
// Error taxonomy
// ===========================================================================

#[test]
fn error_node_not_found_is_input_error() {
    let e = Error::node_not_found("missing-id");
    assert!(e.is_input_error());
    assert!(e.to_string().contains("missing-id"));
}

#[test]
fn error_timeout_is_not_input_error() {
    let e = Error::timeout("execute", 30);
    assert!(!e.is_input_error());
    assert!(e.to_string().contains("30s"));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io_err.into();
    assert!(matches!(e, Error::IoError(_)));
    assert!(!e.is_input_error());
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let e: Error = json_err.into();
    assert!(matches!(e, Error::JsonError(_)));
}

#[test]
fn error_display_all_variants() {
    let errors: Vec<Error> = vec![
        Error::TreeNotFound("t".into()),
        Error::NodeNotFound("n".into()),
        Error::InvalidTree("bad".into()),
        Error::ConfigError("cfg".into()),
        Error::StoreError("store".into()),
        Error::GitError("git".into()),
        Error::CodieError("codie".into()),
        Error::Timeout { op: "plan".into(), secs: 5 },
        Error::Internal("oops".into()),
    ];
    for e in errors {
        assert!(!format!("{}", e).is_empty());
    }
}

// ===========================================================================
// Config: default + ptc.toml override + env precedence
// ===========================================================================

#[test]
fn config_defaults_when_no_file_present() {
    let dir = std::env::temp_dir().join(format!("ptc-core-test-nofile-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let cfg = Config::load(&dir);
    assert!(!cfg.embedding.enabled);
    assert_eq!(cfg.execute_max_parallel, 1);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn config_load_merges_partial_toml_file() {
    let dir = std::env::temp_dir().join(format!("ptc-core-test-toml-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("ptc.toml"),
        "execute_max_parallel = 4\n\n[git]\nenabled = false\n",
    )
    .unwrap();
    let cfg = Config::load(&dir);
    assert_eq!(cfg.execute_max_parallel, 4);
    assert!(!cfg.git.enabled);
    // Untouched sections keep their env-aware defaults.
    assert_eq!(cfg.embedding.dim, 384);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn config_load_ignores_malformed_toml() {
    let dir = std::env::temp_dir().join(format!("ptc-core-test-bad-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ptc.toml"), "this is not [ valid toml").unwrap();
    let cfg = Config::load(&dir);
    assert_eq!(cfg.execute_max_parallel, 1);
    std::fs::remove_dir_all(&dir).ok();
}

// ===========================================================================
// EventBus
// ===========================================================================

#[tokio::test]
async fn event_bus_delivers_to_multiple_subscribers() {
    let bus = EventBus::default();
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();
    bus.emit(PtcEvent::new(event::PHASE, "EXECUTE", json!({"tier": 1})));
    let ea = a.recv().await.unwrap();
    let eb = b.recv().await.unwrap();
    assert_eq!(ea.key, "EXECUTE");
    assert_eq!(eb.key, "EXECUTE");
}

#[test]
fn event_bus_emit_without_subscribers_is_silent() {
    let bus = EventBus::default();
    bus.emit(PtcEvent::new(event::ESCALATION, "auth-module", json!({"to": "executive"})));
}
