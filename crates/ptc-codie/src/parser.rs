//! Line-oriented CODIE parser.
//!
//! Source is a pipe-tree: each non-root line carries a `+--` marker whose
//! column position (divided by 4) gives its nesting depth; `|   ` or four
//! spaces fill the columns above it. No external AST-producing parser is
//! wired in, so every program goes through this fallback (spec.md §4.5).

use crate::ast::CodieNode;
use ptc_core::{Error, Result};

struct Line {
    depth: usize,
    content: String,
}

pub fn parse(source: &str) -> Result<CodieNode> {
    let mut raw_lines = source.lines();
    let first = raw_lines
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::CodieError("empty CODIE source".into()))?;

    let first = first.trim();
    let rest = first
        .strip_prefix("pug")
        .ok_or_else(|| Error::CodieError(format!("expected `pug` entry point, got: {first}")))?
        .trim()
        .to_string();

    let lines: Vec<Line> = raw_lines.filter_map(tokenize_line).collect();
    let mut pos = 0;
    let children = build(&lines, &mut pos, 0);
    Ok(CodieNode::Entry { name: rest, children })
}

fn tokenize_line(line: &str) -> Option<Line> {
    let idx = line.find("+--")?;
    let depth = idx / 4;
    let content = line[idx + 3..].trim().to_string();
    if content.is_empty() {
        None
    } else {
        Some(Line { depth, content })
    }
}

fn build(lines: &[Line], pos: &mut usize, depth: usize) -> Vec<CodieNode> {
    let mut out = Vec::new();
    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.depth < depth {
            break;
        }
        if line.depth > depth {
            // Orphaned deeper line (malformed indentation) — skip defensively.
            *pos += 1;
            continue;
        }
        let content = line.content.clone();
        *pos += 1;
        out.push(parse_node(&content, lines, pos, depth));
    }
    out
}

fn split_once_trim<'a>(s: &'a str, sep: &str) -> (String, String) {
    match s.split_once(sep) {
        Some((a, b)) => (a.trim().to_string(), b.trim().to_string()),
        None => (s.trim().to_string(), String::new()),
    }
}

fn parse_call_args(rest: &str) -> (String, Vec<String>) {
    match rest.find('(') {
        Some(open) if rest.ends_with(')') => {
            let name = rest[..open].trim().to_string();
            let inner = &rest[open + 1..rest.len() - 1];
            let args = if inner.trim().is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(|a| a.trim().to_string()).collect()
            };
            (name, args)
        }
        _ => (rest.trim().to_string(), Vec::new()),
    }
}

fn parse_node(content: &str, lines: &[Line], pos: &mut usize, depth: usize) -> CodieNode {
    let (keyword, rest) = match content.split_once(' ') {
        Some((k, r)) => (k, r.trim()),
        None => (content, ""),
    };

    match keyword {
        "#" => CodieNode::Comment,
        "fence" => {
            let children = build(lines, pos, depth + 1);
            CodieNode::Guard { label: rest.to_string(), children }
        }
        "bone" => {
            let (negate, body) = match rest.strip_prefix("NOT:") {
                Some(b) => (true, b.trim()),
                None => (false, rest),
            };
            let (condition, action) = split_once_trim(body, "->");
            CodieNode::Rule { negate, condition, action }
        }
        "bark" => {
            let (target, source) = split_once_trim(rest, "<-");
            if source.is_empty() {
                CodieNode::Fetch { target: None, source: target }
            } else {
                CodieNode::Fetch { target: Some(target), source }
            }
        }
        "elf" => {
            if rest.contains("<-") {
                let (target, value) = split_once_trim(rest, "<-");
                CodieNode::Bind { target, value: strip_quotes(&value) }
            } else {
                // Label-only grouping header (e.g. `elf context`): its
                // children are binds executed in order, same as `pug`.
                let children = build(lines, pos, depth + 1);
                CodieNode::Entry { name: rest.to_string(), children }
            }
        }
        "pin" => {
            let (name, value) = split_once_trim(rest, "=");
            CodieNode::Const { name, value: strip_quotes(&value) }
        }
        "cali" => {
            let (name, args) = parse_call_args(rest);
            CodieNode::Call { name, args }
        }
        "spin" => {
            let (var, collection) = split_once_trim(rest, "IN");
            let body = build(lines, pos, depth + 1);
            CodieNode::Loop { var, collection, body }
        }
        "turk" => {
            let condition = rest.strip_prefix("IF").unwrap_or(rest).trim().to_string();
            let body = build(lines, pos, depth + 1);
            CodieNode::Transform { condition, body }
        }
        "blob" => {
            let (name, fields_part) = split_once_trim(rest, "{");
            let fields = fields_part
                .trim_end_matches('}')
                .split_whitespace()
                .map(|s| s.to_string())
                .collect();
            CodieNode::Struct { name, fields }
        }
        "biz" => {
            let template = rest.strip_prefix("->").unwrap_or(rest).trim().to_string();
            CodieNode::Return { template }
        }
        "anchor" => CodieNode::Checkpoint { label: rest.trim_start_matches('#').to_string() },
        "pug" => {
            let children = build(lines, pos, depth + 1);
            CodieNode::Entry { name: rest.to_string(), children }
        }
        _ => CodieNode::Comment,
    }
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_and_direct_children() {
        let src = "pug NODE\n|\n+-- bark content <- @fs/read(x.rs)\n|\n+-- biz -> result\n";
        let ast = parse(src).unwrap();
        match ast {
            CodieNode::Entry { name, children } => {
                assert_eq!(name, "NODE");
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], CodieNode::Fetch { .. }));
                assert!(matches!(children[1], CodieNode::Return { .. }));
            }
            _ => panic!("expected Entry"),
        }
    }

    #[test]
    fn parses_nested_fence_with_bone_children() {
        let src = "pug N\n|\n+-- fence RULES\n|   +-- bone NOT: destroy_root -> block\n|\n+-- cali BUILD()\n";
        let ast = parse(src).unwrap();
        let CodieNode::Entry { children, .. } = ast else { panic!() };
        let CodieNode::Guard { children: rules, .. } = &children[0] else { panic!("expected Guard") };
        let CodieNode::Rule { negate, condition, action } = &rules[0] else { panic!("expected Rule") };
        assert!(negate);
        assert_eq!(condition, "destroy_root");
        assert_eq!(action, "block");
        assert!(matches!(children[1], CodieNode::Call { .. }));
    }

    #[test]
    fn parses_call_with_args() {
        let src = "pug N\n|\n+-- cali EXECUTE_INTENT(context, extra)\n";
        let ast = parse(src).unwrap();
        let CodieNode::Entry { children, .. } = ast else { panic!() };
        let CodieNode::Call { name, args } = &children[0] else { panic!("expected Call") };
        assert_eq!(name, "EXECUTE_INTENT");
        assert_eq!(args, &vec!["context".to_string(), "extra".to_string()]);
    }

    #[test]
    fn rejects_source_without_pug_entry() {
        assert!(parse("not a codie program").is_err());
    }
}
