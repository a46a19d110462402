//! Per-mode dispatch. Each function returns the `serde_json::Value`
//! the caller wraps into a [`ptc_core::TaskResult`]. Grounded on
//! `ptc/executor.py`'s `_execute_*` family, generalized away from the
//! original's project-specific Makefile targets (`make build-cli`,
//! `make mongo-ping`, ...) and `gently-*` crate-name prefix — this
//! workspace's own crates are `ptc-*`, and there is no Makefile to shell
//! out to, so `shell`/`native` only ever construct `cargo`/`nix` commands.

use crate::risk::ApprovalDecision;
use crate::shell;
use chrono::Utc;
use ptc_architect::{Architect, BlueprintContext};
use ptc_core::{Config, Error, Result, Task};
use regex::Regex;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const SHELL_TIMEOUT_SECS: u64 = 30;
const CARGO_TIMEOUT_SECS: u64 = 300;
const NIX_TIMEOUT_SECS: u64 = 600;

pub fn plan(task: &Task) -> Value {
    json!({
        "mode": "plan",
        "intent": task.intent,
        "node": task.node_id.as_str(),
        "files": task.files,
        "functions": task.functions,
        "rules_applied": task.rules.iter().map(|r| r.name.clone()).collect::<Vec<_>>(),
        "summary": format!("Planning: {}", task.intent),
    })
}

pub async fn inspect(task: &Task, root: &Path) -> Value {
    let mut inspected = Vec::with_capacity(task.files.len());
    for f in &task.files {
        let path = root.join(f);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                let modified = meta
                    .modified()
                    .ok()
                    .map(chrono::DateTime::<Utc>::from)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                inspected.push(json!({"file": f, "exists": true, "size": meta.len(), "modified": modified}));
            }
            Err(_) => inspected.push(json!({"file": f, "exists": false})),
        }
    }
    let summary = format!("Inspected {} files for {}", inspected.len(), task.node_name);
    json!({"mode": "inspect", "inspected": inspected, "summary": summary})
}

/// Translate an intent into one of a small set of known-safe commands.
/// Unlike the original, this never shells out to a project Makefile —
/// only `cargo`/`nix` invocations this workspace actually understands.
fn intent_to_command(task: &Task) -> Option<String> {
    let intent = task.intent.to_lowercase();
    let crate_re = Regex::new(r"(ptc-[\w-]+)").expect("static regex");
    let crate_name = crate_re.find(&intent).map(|m| m.as_str().to_string());

    if intent.contains("cargo") && intent.contains("build") {
        return Some(match &crate_name {
            Some(c) => format!("cargo build -p {c}"),
            None => "cargo build --workspace".to_string(),
        });
    }
    if intent.contains("cargo") && intent.contains("test") {
        return Some(match &crate_name {
            Some(c) => format!("cargo test -p {c}"),
            None => "cargo test --workspace".to_string(),
        });
    }
    if intent.contains("cargo") && intent.contains("clippy") {
        return Some(match &crate_name {
            Some(c) => format!("cargo clippy -p {c}"),
            None => "cargo clippy --workspace".to_string(),
        });
    }
    if intent.contains("status") || intent.contains("check") {
        return Some("cargo metadata --no-deps --format-version 1".to_string());
    }
    if intent.contains("nix") && intent.contains("build") {
        return Some("nix build".to_string());
    }
    if intent.contains("nix") && intent.contains("flake") {
        return Some("nix flake check".to_string());
    }
    None
}

pub async fn shell(task: &Task, root: &Path) -> Result<Value> {
    let Some(command) = intent_to_command(task) else {
        return Ok(json!({"mode": "shell", "status": "skipped", "reason": format!("could not construct safe command for: {}", task.intent)}));
    };

    match shell::run(&command, root, SHELL_TIMEOUT_SECS).await {
        Ok(out) => Ok(json!({"mode": "shell", "command": command, "exit_code": out.exit_code, "stdout": out.stdout, "stderr": out.stderr})),
        Err(Error::Timeout { .. }) => Ok(json!({"mode": "shell", "command": command, "status": "timeout", "error": "command timed out after 30s"})),
        Err(e) => Ok(json!({"mode": "shell", "command": command, "status": "error", "error": e.to_string()})),
    }
}

fn extract_crate_name(intent: &str) -> Option<String> {
    Regex::new(r"(ptc-[\w-]+)").ok()?.find(intent).map(|m| m.as_str().to_string())
}

fn extract_nix_target(intent: &str) -> Option<String> {
    if let Some(m) = Regex::new(r"\.#([\w-]+)").ok()?.captures(intent) {
        return m.get(1).map(|g| g.as_str().to_string());
    }
    extract_crate_name(intent)
}

pub async fn native(task: &Task, root: &Path, approval: &ApprovalDecision) -> Value {
    let intent = task.intent.to_lowercase();

    // `nixos-rebuild` forces risk 9 in `score_risk`, so the approval gate
    // in `Executor::execute` always blocks it before this function runs.

    if intent.contains("nix ") || intent.contains("nix build") || intent.contains("nix develop") || intent.contains("nix flake") {
        let cmd = if intent.contains("flake") {
            "nix flake check".to_string()
        } else if intent.contains("develop") {
            "nix develop --command echo devshell-ok".to_string()
        } else if let Some(target) = extract_nix_target(&intent) {
            format!("nix build .#{target}")
        } else {
            "nix build".to_string()
        };
        return native_run("nix", &cmd, root, NIX_TIMEOUT_SECS, approval).await;
    }

    let crate_name = extract_crate_name(&intent);
    let cmd = if intent.contains("test") {
        crate_name.map(|c| format!("cargo test -p {c}")).unwrap_or_else(|| "cargo test --workspace".to_string())
    } else if intent.contains("clippy") {
        crate_name.map(|c| format!("cargo clippy -p {c}")).unwrap_or_else(|| "cargo clippy --workspace".to_string())
    } else if intent.contains("fmt") {
        "cargo fmt --all --check".to_string()
    } else {
        crate_name.map(|c| format!("cargo build -p {c}")).unwrap_or_else(|| "cargo build --workspace".to_string())
    };
    native_run("cargo", &cmd, root, CARGO_TIMEOUT_SECS, approval).await
}

async fn native_run(sub_mode: &str, cmd: &str, root: &Path, timeout_secs: u64, approval: &ApprovalDecision) -> Value {
    match shell::run(cmd, root, timeout_secs).await {
        Ok(out) => json!({
            "mode": "native", "sub_mode": sub_mode, "command": cmd,
            "exit_code": out.exit_code, "stdout": out.stdout, "stderr": out.stderr,
            "risk": approval.risk,
        }),
        Err(Error::Timeout { .. }) => json!({
            "mode": "native", "sub_mode": sub_mode, "command": cmd,
            "status": "timeout", "error": format!("{sub_mode} command timed out after {timeout_secs}s"),
        }),
        Err(e) => json!({"mode": "native", "sub_mode": sub_mode, "command": cmd, "status": "error", "error": e.to_string()}),
    }
}

/// Build the structured `## Task / ## Node / ...` prompt handed to the
/// LLM CLI. Grounded on `ptc/executor.py::_build_claude_instruction`.
pub fn build_claude_instruction(task: &Task) -> String {
    let mut parts = vec![
        format!("## Task: {}", task.intent),
        format!("## Node: {} ({})", task.node_name, task.node_id),
        format!("## Scale: {:?}", task.scale),
    ];
    if !task.lineage.is_empty() {
        let lineage: Vec<&str> = task.lineage.iter().map(|n| n.as_str()).collect();
        parts.push(format!("## Lineage: {}", lineage.join(" -> ")));
    }
    if !task.files.is_empty() {
        parts.push(format!("## Files: {}", task.files.join(", ")));
    }
    if !task.functions.is_empty() {
        parts.push(format!("## Functions: {}", task.functions.join(", ")));
    }
    if !task.rules.is_empty() {
        parts.push("## Rules:".to_string());
        for r in &task.rules {
            parts.push(format!("  - {}: IF {} THEN {:?}", r.name, r.condition, r.action));
        }
    }
    if let Some(target) = &task.escalation.target_id {
        let threshold = task.escalation.threshold.map(|t| t.to_string()).unwrap_or_else(|| "?".to_string());
        parts.push(format!("## Escalation: -> {target} if risk >= {threshold}"));
    }
    parts.join("\n")
}

pub async fn claude(task: &Task, root: &Path, config: &Config) -> Value {
    let instruction = build_claude_instruction(task);

    if !config.llm_cli.enabled {
        return json!({"mode": "claude", "status": "fallback", "reason": "llm cli disabled", "instruction": instruction});
    }

    let result = tokio::time::timeout(
        Duration::from_secs(config.llm_cli.timeout_secs),
        Command::new(&config.llm_cli.command).arg("--print").arg(&instruction).current_dir(root).output(),
    )
    .await;

    match result {
        Err(_) => json!({"mode": "claude", "status": "timeout", "error": format!("claude CLI timed out after {}s", config.llm_cli.timeout_secs), "instruction": instruction}),
        Ok(Err(_)) => json!({"mode": "claude", "status": "fallback", "reason": "claude CLI not found in PATH", "instruction": instruction}),
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().chars().take(10_000).collect::<String>();
            let stderr = if output.status.success() { String::new() } else { String::from_utf8_lossy(&output.stderr).trim().chars().take(2000).collect() };
            json!({
                "mode": "claude",
                "exit_code": output.status.code(),
                "output": stdout,
                "stderr": stderr,
                "instruction": instruction,
            })
        }
    }
}

pub async fn design(task: &Task, architect: &Architect) -> Result<Value> {
    let context = BlueprintContext { node_id: Some(task.node_id.clone()), files: task.files.clone(), rules: task.rules.clone(), lineage: task.lineage.clone(), project: None };
    let blueprint = architect.create_blueprint(&task.intent, &context).await?;
    Ok(json!({
        "blueprint_id": blueprint.id,
        "name": blueprint.name,
        "cached": blueprint.cached,
        "task_count": blueprint.content.builder_tasks.len(),
        "status": blueprint.status,
        "hash": blueprint.content_hash,
    }))
}

pub fn compose(task: &Task) -> Value {
    let lineage: Vec<&str> = task.lineage.iter().map(|n| n.as_str()).collect();
    json!({"composed_from": lineage, "summary": format!("Composition point for {}", task.node_name)})
}
