//! CODIE interpreter: walks the AST, resolves `bark` sources, enforces the
//! `cali` safe-call whitelist, and evaluates `fence`/`bone` constraints.

use crate::ast::CodieNode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

const CALI_TIMEOUT_SECS: u64 = 30;
const FETCH_READ_LIMIT: usize = 50_000;

/// Shell-backed `cali` targets must start with one of these prefixes —
/// mirrors the CODIE safe-call contract (spec.md §4.5).
const ALLOWED_SHELL_PREFIXES: &[&str] = &["cargo ", "make ", "nix "];

#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace {
    pub checkpoints: Vec<Value>,
    pub variables: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub node_id: String,
    pub intent: String,
    pub root: PathBuf,
    constants: std::collections::HashSet<String>,
    active_rules: Vec<(bool, String, String)>,
    trace: ExecutionTrace,
}

impl Context {
    pub fn new(node_id: impl Into<String>, intent: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            node_id: node_id.into(),
            intent: intent.into(),
            root: root.as_ref().to_path_buf(),
            constants: Default::default(),
            active_rules: Vec::new(),
            trace: ExecutionTrace::default(),
        }
    }

    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    fn set(&mut self, name: &str, value: Value) {
        if self.constants.contains(name) {
            return;
        }
        self.trace.variables.insert(name.to_string(), value);
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.trace.variables.get(name)
    }
}

/// Outcome of interpreting a program: either a halt (a constraint violation
/// recorded, never raised as an exception) or a produced value.
#[derive(Debug, Clone)]
pub enum Outcome {
    Halted { reason: String },
    Value(Value),
}

pub async fn interpret(program: &CodieNode, ctx: &mut Context) -> Outcome {
    let CodieNode::Entry { children, .. } = program else {
        return Outcome::Value(json!({"error": "program root is not an Entry node"}));
    };
    match exec_block(children, ctx).await {
        Ok(Some(v)) => Outcome::Value(v),
        Ok(None) => Outcome::Value(json!({"completed": true, "checkpoints": ctx.trace.checkpoints})),
        Err(reason) => Outcome::Halted { reason },
    }
}

/// Runs a sibling block, returning the last non-null result, or `Err(reason)`
/// on a halt from a nested `fence`/`bone` violation.
fn exec_block<'a>(
    nodes: &'a [CodieNode],
    ctx: &'a mut Context,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<Value>, String>> + 'a>> {
    Box::pin(async move {
        let mut last = None;
        for node in nodes {
            if let Some(v) = exec_node(node, ctx).await? {
                last = Some(v);
            }
        }
        Ok(last)
    })
}

fn exec_node<'a>(
    node: &'a CodieNode,
    ctx: &'a mut Context,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<Value>, String>> + 'a>> {
    Box::pin(async move {
        match node {
            CodieNode::Comment => Ok(None),
            CodieNode::Entry { children, .. } => exec_block(children, ctx).await,
            CodieNode::Fetch { target, source } => {
                let value = resolve_source(source, ctx).await;
                if let Some(t) = target {
                    ctx.set(t, value);
                }
                Ok(None)
            }
            CodieNode::Bind { target, value } => {
                let resolved = interpolate(value, ctx);
                ctx.set(target, Value::String(resolved));
                Ok(None)
            }
            CodieNode::Const { name, value } => {
                let resolved = interpolate(value, ctx);
                ctx.set(name, Value::String(resolved));
                ctx.constants.insert(name.clone());
                Ok(None)
            }
            CodieNode::Call { name, args } => Ok(Some(exec_call(name, args, ctx).await)),
            CodieNode::Loop { var, collection, body } => {
                let items = resolve_collection(collection, ctx);
                let mut last = None;
                for item in items {
                    ctx.set(var, item);
                    last = exec_block(body, ctx).await?;
                }
                Ok(last)
            }
            CodieNode::Transform { condition, body } => {
                if eval_condition(condition, ctx) {
                    let result = exec_block(body, ctx).await?;
                    if let Some(v) = result.clone() {
                        ctx.set("_transform_result", v);
                    }
                    Ok(result)
                } else {
                    Ok(None)
                }
            }
            CodieNode::Guard { children, .. } => {
                for child in children {
                    if let CodieNode::Rule { negate, condition, action } = child {
                        ctx.active_rules.push((*negate, condition.clone(), action.clone()));
                        let holds = eval_condition(condition, ctx);
                        let effective = if *negate { !holds } else { holds };
                        if effective && action == "block" {
                            return Err(format!("constraint violated: {}{}", if *negate { "NOT:" } else { "" }, condition));
                        }
                    }
                }
                Ok(None)
            }
            CodieNode::Rule { .. } => Ok(None),
            CodieNode::Struct { name, fields } => {
                let zeroed: Value = Value::Object(fields.iter().map(|f| (f.clone(), Value::Null)).collect());
                ctx.set(name, zeroed);
                Ok(None)
            }
            CodieNode::Return { template } => Ok(Some(Value::String(interpolate(template, ctx)))),
            CodieNode::Checkpoint { label } => {
                let snapshot = json!({
                    "label": label,
                    "variables": ctx.trace.variables.keys().collect::<Vec<_>>(),
                });
                ctx.trace.checkpoints.push(snapshot);
                Ok(None)
            }
        }
    })
}

fn interpolate(template: &str, ctx: &Context) -> String {
    let mut out = template.to_string();
    for (name, value) in &ctx.trace.variables {
        let placeholder = format!("{{{name}}}");
        if out.contains(&placeholder) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out = out.replace(&placeholder, &text);
        }
        if let Value::Object(map) = value {
            for (field, v) in map {
                let placeholder = format!("{{{name}.{field}}}");
                if out.contains(&placeholder) {
                    let text = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    out = out.replace(&placeholder, &text);
                }
            }
        }
    }
    out
}

fn resolve_collection(reference: &str, ctx: &Context) -> Vec<Value> {
    match ctx.get(reference.trim()) {
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    }
}

/// Evaluates `name`, `name.field`, `name.field < N`, `name.field > N` — the
/// only operators CODIE conditions support (spec.md §4.5).
fn eval_condition(condition: &str, ctx: &Context) -> bool {
    let condition = condition.trim();
    for (op, cmp): (&str, fn(f64, f64) -> bool) in [("<", |a, b| a < b), (">", |a, b| a > b)] {
        if let Some((lhs, rhs)) = condition.split_once(op) {
            let Ok(threshold) = rhs.trim().parse::<f64>() else { continue };
            let value = resolve_field(lhs.trim(), ctx).and_then(|v| v.as_f64());
            return value.map(|v| cmp(v, threshold)).unwrap_or(false);
        }
    }
    resolve_field(condition, ctx).map(is_truthy).unwrap_or(false)
}

fn resolve_field(reference: &str, ctx: &Context) -> Option<Value> {
    match reference.split_once('.') {
        Some((name, field)) => ctx.get(name)?.get(field).cloned(),
        None => ctx.get(reference).cloned(),
    }
}

fn is_truthy(value: Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

async fn resolve_source(source: &str, ctx: &Context) -> Value {
    let source = interpolate(source.trim(), ctx);

    if let Some(path) = source.strip_prefix("@fs/read(").and_then(|s| s.strip_suffix(')')) {
        return read_file(path, &ctx.root).await;
    }
    if let Some(query) = source.strip_prefix("@system/") {
        return system_query(query).await;
    }
    if let Some(op) = source.strip_prefix("@cargo/") {
        return cargo_op(op, &ctx.root).await;
    }
    if let Some(tool) = source.strip_prefix("@toolchain/") {
        return check_toolchain(tool).await;
    }
    if let Some(validator) = source.strip_prefix("@validators/") {
        return run_validator(validator, &ctx.root).await;
    }
    if let Some(path) = source.strip_prefix('@') {
        return read_file(path, &ctx.root).await;
    }
    read_file(&source, &ctx.root).await
}

async fn read_file(path: &str, root: &Path) -> Value {
    let full = root.join(path);
    match tokio::fs::read_to_string(&full).await {
        Ok(contents) => Value::String(contents.chars().take(FETCH_READ_LIMIT).collect()),
        Err(e) => json!({"error": e.to_string(), "path": path}),
    }
}

async fn system_query(query: &str) -> Value {
    match query {
        "detect_os" => json!({
            "type": std::env::consts::OS,
            "release": "",
            "machine": std::env::consts::ARCH,
        }),
        "detect_all" => {
            let (disk_total_gb, disk_free_gb) = disk_usage_gb().await;
            json!({
                "type": std::env::consts::OS,
                "release": "",
                "machine": std::env::consts::ARCH,
                "disk_total_gb": disk_total_gb,
                "disk_free_gb": disk_free_gb,
            })
        }
        other => json!({"error": format!("unknown system query: {other}")}),
    }
}

/// `df -k /`'s second line is `filesystem 1k-blocks used available use% mount`;
/// fields 2 and 4 converted to GiB, rounded to one decimal, `0.0` on failure.
async fn disk_usage_gb() -> (f64, f64) {
    let output = tokio::time::timeout(Duration::from_secs(5), Command::new("df").arg("-k").arg("/").output()).await;
    let Ok(Ok(output)) = output else { return (0.0, 0.0) };
    let stdout = String::from_utf8_lossy(&output.stdout);
    let Some(fields) = stdout.lines().nth(1).map(|l| l.split_whitespace().collect::<Vec<_>>()) else {
        return (0.0, 0.0);
    };
    let kib_to_gib = |kib: f64| (kib / (1024.0 * 1024.0) * 10.0).round() / 10.0;
    let total = fields.get(1).and_then(|s| s.parse::<f64>().ok()).map(kib_to_gib).unwrap_or(0.0);
    let free = fields.get(3).and_then(|s| s.parse::<f64>().ok()).map(kib_to_gib).unwrap_or(0.0);
    (total, free)
}

async fn cargo_op(op: &str, root: &Path) -> Value {
    if let Some(crate_name) = op.strip_prefix("build(").and_then(|s| s.strip_suffix(')')) {
        return run_shell(&format!("cargo build -p {crate_name}"), root).await;
    }
    if op == "test_workspace" {
        return run_shell("cargo test --workspace", root).await;
    }
    json!({"error": format!("unknown cargo op: {op}")})
}

async fn check_toolchain(tool: &str) -> Value {
    match tokio::process::Command::new(tool).arg("--version").output().await {
        Ok(out) if out.status.success() => {
            json!({"present": true, "version": String::from_utf8_lossy(&out.stdout).trim()})
        }
        _ => json!({"missing": true}),
    }
}

async fn run_validator(script: &str, root: &Path) -> Value {
    run_shell(&format!("./validators/{script}"), root).await
}

async fn run_shell(command: &str, root: &Path) -> Value {
    let output = tokio::time::timeout(
        Duration::from_secs(CALI_TIMEOUT_SECS),
        Command::new("bash").arg("-c").arg(command).current_dir(root).output(),
    )
    .await;

    match output {
        Ok(Ok(out)) => json!({
            "exit_code": out.status.code(),
            "stdout": String::from_utf8_lossy(&out.stdout).chars().take(5000).collect::<String>(),
            "stderr": String::from_utf8_lossy(&out.stderr).chars().take(2000).collect::<String>(),
        }),
        Ok(Err(e)) => json!({"error": e.to_string()}),
        Err(_) => json!({"status": "timeout", "error": format!("timed out after {CALI_TIMEOUT_SECS}s")}),
    }
}

async fn exec_call(name: &str, args: &[String], ctx: &Context) -> Value {
    match name {
        "EXECUTE_INTENT" => json!({"action": "execute_intent", "intent": ctx.intent, "args": args}),
        "SEED" => json!({"action": "seed", "args": args}),
        "BUILD" => dispatch_shell_call("cargo build --workspace", &ctx.root).await,
        "TEST" => dispatch_shell_call("cargo test --workspace", &ctx.root).await,
        "STATUS" => dispatch_shell_call("make status", &ctx.root).await,
        "VERIFY" => dispatch_shell_call("make verify-sandbox", &ctx.root).await,
        _ => json!({"call": name, "status": "planned", "reason": "unknown call pattern"}),
    }
}

async fn dispatch_shell_call(command: &str, root: &Path) -> Value {
    if !ALLOWED_SHELL_PREFIXES.iter().any(|p| command.starts_with(p)) {
        return json!({"status": "blocked", "reason": "not in safe command set"});
    }
    run_shell(command, root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[tokio::test]
    async fn entry_point_returns_last_non_null_child_result() {
        let program = parse("pug N\n|\n+-- pin X = 1\n|\n+-- biz -> done\n").unwrap();
        let mut ctx = Context::new("n1", "do it", ".");
        match interpret(&program, &mut ctx).await {
            Outcome::Value(v) => assert_eq!(v, json!("done")),
            other => panic!("expected Value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fence_with_bare_constraint_records_but_does_not_halt() {
        // `bone NOT: destroy_root` with no `-> action` only records the
        // constraint; the unknown `cali` target is what falls back to
        // `planned`, and the run completes rather than halting.
        let program = parse(concat!(
            "pug N\n|\n",
            "+-- fence RULES\n|   +-- bone NOT: destroy_root\n|\n",
            "+-- cali DESTROY_ROOT()\n",
        ))
        .unwrap();
        let mut ctx = Context::new("n1", "destroy", ".");
        match interpret(&program, &mut ctx).await {
            Outcome::Value(v) => {
                assert_eq!(v["status"], json!("planned"));
                assert!(ctx.trace.checkpoints.is_empty());
            }
            other => panic!("expected Value, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fence_halts_when_blocking_rule_condition_holds() {
        let program = parse(concat!(
            "pug N\n|\n",
            "+-- pin danger = true\n|\n",
            "+-- fence RULES\n|   +-- bone danger -> block\n",
        ))
        .unwrap();
        let mut ctx = Context::new("n1", "go", ".");
        match interpret(&program, &mut ctx).await {
            Outcome::Halted { reason } => assert!(reason.contains("danger")),
            other => panic!("expected Halted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_cali_target_is_planned_not_executed() {
        let program = parse("pug N\n|\n+-- cali DESTROY_ROOT()\n").unwrap();
        let mut ctx = Context::new("n1", "destroy", ".");
        match interpret(&program, &mut ctx).await {
            Outcome::Value(v) => {
                assert_eq!(v["status"], json!("planned"));
                assert_eq!(v["call"], json!("DESTROY_ROOT"));
            }
            other => panic!("expected Value, got {other:?}"),
        }
    }

    #[test]
    fn condition_eval_handles_comparisons() {
        let mut ctx = Context::new("n", "i", ".");
        ctx.set("risk", json!(7));
        assert!(eval_condition("risk > 5", &ctx));
        assert!(!eval_condition("risk < 5", &ctx));
    }

    #[test]
    fn interpolate_resolves_field_references() {
        let mut ctx = Context::new("n", "i", ".");
        ctx.set("platform", json!({"type": "linux"}));
        assert_eq!(interpolate("os is {platform.type}", &ctx), "os is linux");
    }
}
