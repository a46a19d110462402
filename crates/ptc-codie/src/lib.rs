//! CODIE — a small declarative language that encodes a leaf task as an AST
//! of typed nodes (`pug`/`bark`/`elf`/`cali`/`spin`/`turk`/`fence`/`bone`/
//! `pin`/`blob`/`biz`/`anchor`), interpreted against a whitelisted context.

pub mod ast;
pub mod interp;
pub mod parser;
pub mod synth;

pub use ast::CodieNode;
pub use interp::{interpret, Context, Outcome};
pub use parser::parse;
pub use synth::synthesize;

use ptc_core::Task;
use serde_json::{json, Value};
use std::path::Path;

/// Full CODIE leaf-execution contract (spec.md §4.6 `codie` mode): obtain
/// source, parse, interpret, return `{status, result, checkpoints,
/// variables_set}`. Artifact storage is the caller's responsibility (it
/// already holds a Content Store handle).
pub async fn execute_task(task: &Task, root: impl AsRef<Path>) -> (Value, Value) {
    let source = task.codie_program.clone().unwrap_or_else(|| synthesize(task));

    let program = match parse(&source) {
        Ok(p) => p,
        Err(e) => {
            return (
                json!({"status": "error", "error": e.to_string()}),
                Value::String(source),
            )
        }
    };

    let mut ctx = Context::new(task.node_id.as_str(), task.intent.clone(), root);
    let outcome = interpret(&program, &mut ctx).await;

    let result = match outcome {
        Outcome::Halted { reason } => json!({"halted": true, "reason": reason}),
        Outcome::Value(v) => v,
    };

    let status = if result.get("error").is_some() { "failed" } else { "completed" };
    let variable_names: Vec<&String> = ctx.trace().variables.keys().collect();

    (
        json!({
            "status": status,
            "result": result,
            "checkpoints": ctx.trace().checkpoints,
            "variables_set": variable_names,
        }),
        Value::String(source),
    )
}
