//! Mode detection — classify a task's intent into one of the dispatch
//! modes. Grounded on `ptc/executor.py::_detect_mode`; first match wins.

use ptc_core::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Codie,
    Native,
    Design,
    Inspect,
    Shell,
    Claude,
    Plan,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Codie => "codie",
            Mode::Native => "native",
            Mode::Design => "design",
            Mode::Inspect => "inspect",
            Mode::Shell => "shell",
            Mode::Claude => "claude",
            Mode::Plan => "plan",
        }
    }
}

const NATIVE_WORDS: &[&str] = &[
    "cargo build",
    "cargo test",
    "cargo clippy",
    "cargo fmt",
    "nix build",
    "nix develop",
    "nix flake",
    "nixos-rebuild",
    "rebuild crate",
    "rebuild tier",
];
const DESIGN_WORDS: &[&str] = &["design", "architect", "blueprint", "specify", "plan architecture", "draft"];
const INSPECT_WORDS: &[&str] = &["show", "list", "check", "verify", "audit", "status", "inspect", "read"];
const SHELL_WORDS: &[&str] = &["build", "run", "install", "deploy", "start", "stop", "restart"];
const CLAUDE_WORDS: &[&str] = &["create", "add", "implement", "fix", "refactor", "write", "update", "modify"];

/// First match wins — the ordering of these checks *is* the contract.
pub fn detect_mode(task: &Task) -> Mode {
    let intent = task.intent.to_lowercase();

    if task.codie_program.is_some() || intent.contains("codie") {
        return Mode::Codie;
    }
    if NATIVE_WORDS.iter().any(|w| intent.contains(w)) {
        return Mode::Native;
    }
    if DESIGN_WORDS.iter().any(|w| intent.contains(w)) {
        return Mode::Design;
    }
    if INSPECT_WORDS.iter().any(|w| intent.contains(w)) {
        return Mode::Inspect;
    }
    if SHELL_WORDS.iter().any(|w| intent.contains(w)) {
        return Mode::Shell;
    }
    if CLAUDE_WORDS.iter().any(|w| intent.contains(w)) {
        return Mode::Claude;
    }
    Mode::Plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_core::{Escalation, NodeId, Scale};

    fn task(intent: &str) -> Task {
        Task {
            node_id: NodeId::from("crate:ptc-core"),
            node_name: "ptc-core".into(),
            scale: Scale::Crate,
            intent: intent.to_string(),
            lineage: vec![],
            files: vec![],
            functions: vec![],
            rules: vec![],
            escalation: Escalation::default(),
            codie_program: None,
            blueprint_id: None,
            task_id: None,
            acceptance: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn codie_program_wins_even_with_shell_words() {
        let mut t = task("build this");
        t.codie_program = Some("pug X\n".into());
        assert_eq!(detect_mode(&t), Mode::Codie);
    }

    #[test]
    fn codie_keyword_beats_shell_words_in_intent() {
        assert_eq!(detect_mode(&task("codie build the module")), Mode::Codie);
    }

    #[test]
    fn native_beats_shell_for_cargo_build() {
        assert_eq!(detect_mode(&task("please run cargo build for this crate")), Mode::Native);
    }

    #[test]
    fn design_beats_inspect_for_blueprint_intents() {
        assert_eq!(detect_mode(&task("draft a blueprint to check the auth flow")), Mode::Design);
    }

    #[test]
    fn inspect_beats_shell_for_status_checks() {
        assert_eq!(detect_mode(&task("check build status")), Mode::Inspect);
    }

    #[test]
    fn shell_beats_claude_for_deploy() {
        assert_eq!(detect_mode(&task("deploy and update the service")), Mode::Shell);
    }

    #[test]
    fn claude_for_implementation_intents() {
        assert_eq!(detect_mode(&task("implement rate limiting")), Mode::Claude);
    }

    #[test]
    fn plan_is_the_fallback() {
        assert_eq!(detect_mode(&task("investigate the anomaly")), Mode::Plan);
    }
}
