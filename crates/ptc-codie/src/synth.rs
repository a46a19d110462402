//! Synthesize a CODIE program from a PTC task's fields, when the task
//! doesn't carry its own `codie_program`. Grounded in the original
//! `_build_codie_instruction`.

use ptc_core::Task;

pub fn synthesize(task: &Task) -> String {
    let safe_id = task.node_id.as_str().replace(':', "_").to_uppercase();
    let mut lines = vec![format!("pug {safe_id}"), "|".to_string()];

    if !task.rules.is_empty() {
        lines.push("+-- fence RULES".to_string());
        for rule in &task.rules {
            lines.push(format!("|   +-- bone {} -> {}", rule.condition, format!("{:?}", rule.action).to_lowercase()));
        }
        lines.push("|".to_string());
    }

    lines.push("+-- elf context".to_string());
    lines.push(format!("|   +-- elf node_id <- \"{}\"", task.node_id));
    lines.push(format!("|   +-- elf intent <- \"{}\"", task.intent));
    lines.push("|".to_string());

    for file in &task.files {
        lines.push(format!("+-- bark content <- @fs/read({file})"));
    }
    lines.push("|".to_string());

    lines.push("+-- cali EXECUTE_INTENT(context)".to_string());
    lines.push("|".to_string());

    lines.push("+-- biz -> result".to_string());
    let safe_anchor = task.node_id.as_str().replace(':', "_");
    lines.push(format!("    +-- anchor #{safe_anchor}"));

    lines.join("\n")
}
