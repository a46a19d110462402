//! Git Layer — branch-per-blueprint/task conventions and commit plumbing.
//!
//! Git branches exist for the human reading the repo; the tree and trace
//! stores are the real navigation structure. Every operation shells out to
//! `git` with a timeout, matching the CLI's "never hang the pipeline on an
//! external process" discipline used for shell/native task execution.
//!
//! Branch conventions:
//!   `design/<blueprint-id>` — architectural designs
//!   `build/<blueprint-id>/<task-id>` — builder execution
//!   `verify/<blueprint-id>` — verification results
//!   `main` — merged, verified work

use chrono::Utc;
use ptc_core::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const GIT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct BranchResult {
    pub branch: String,
    pub created: bool,
    pub previous_branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommitResult {
    pub sha: Option<String>,
    pub message: String,
    pub branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoggedCommit {
    pub sha: String,
    pub message: String,
    pub date: String,
}

#[derive(Debug, Clone)]
pub struct BranchDiff {
    pub branch: String,
    pub files_changed: usize,
    pub diff_stat: String,
}

#[derive(Debug, Clone)]
pub struct BranchInfo {
    pub name: String,
    pub current: bool,
    pub sha: String,
    pub message: String,
}

fn slugify(id: &str) -> String {
    id.replace(':', "-").replace(' ', "-")
}

pub struct GitLayer {
    root: PathBuf,
}

impl GitLayer {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    async fn git(&self, args: &[&str]) -> Result<(bool, String, String)> {
        debug!(?args, "git");
        let output = tokio::time::timeout(
            std::time::Duration::from_secs(GIT_TIMEOUT_SECS),
            Command::new("git").args(args).current_dir(&self.root).output(),
        )
        .await
        .map_err(|_| Error::timeout("git", GIT_TIMEOUT_SECS))?
        .map_err(|e| Error::GitError(e.to_string()))?;

        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }

    async fn current_branch(&self) -> Option<String> {
        let (ok, out, _) = self.git(&["rev-parse", "--abbrev-ref", "HEAD"]).await.ok()?;
        ok.then_some(out)
    }

    async fn branch_exists(&self, name: &str) -> bool {
        matches!(self.git(&["rev-parse", "--verify", name]).await, Ok((true, _, _)))
    }

    async fn stash_if_dirty(&self) -> Result<bool> {
        let (ok, out, _) = self.git(&["status", "--porcelain"]).await?;
        if ok && !out.is_empty() {
            self.git(&["stash", "push", "-m", "ptc: auto-stash for branch switch"]).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn unstash(&self) -> Result<()> {
        self.git(&["stash", "pop"]).await?;
        Ok(())
    }

    /// Create or check out the `design/<blueprint-id>` branch, stashing
    /// dirty work before switching onto an existing branch.
    pub async fn branch_for_blueprint(&self, blueprint_id: &str) -> Result<BranchResult> {
        let branch_name = format!("design/{}", slugify(blueprint_id));
        let previous = self.current_branch().await;
        let mut created = false;

        if !self.branch_exists(&branch_name).await {
            let (ok, _, err) = self.git(&["checkout", "-b", &branch_name]).await?;
            if !ok {
                return Err(Error::GitError(format!("failed to create branch: {}", err)));
            }
            created = true;
        } else if self.current_branch().await.as_deref() != Some(branch_name.as_str()) {
            let stashed = self.stash_if_dirty().await?;
            let (ok, _, err) = self.git(&["checkout", &branch_name]).await?;
            if !ok {
                if stashed {
                    self.unstash().await?;
                }
                return Err(Error::GitError(format!("failed to checkout branch: {}", err)));
            }
        }

        Ok(BranchResult { branch: branch_name, created, previous_branch: previous })
    }

    /// Create or check out `build/<blueprint-id>/<task-id>`, branching from
    /// the blueprint's design branch when it exists, `main` otherwise.
    pub async fn build_branch(&self, blueprint_id: &str, task_id: &str) -> Result<BranchResult> {
        let branch_name = format!("build/{}/{}", slugify(blueprint_id), slugify(task_id));

        if !self.branch_exists(&branch_name).await {
            let design_branch = format!("design/{}", slugify(blueprint_id));
            let base = if self.branch_exists(&design_branch).await { design_branch } else { "main".to_string() };
            let (ok, _, err) = self.git(&["checkout", "-b", &branch_name, &base]).await?;
            if !ok {
                return Err(Error::GitError(format!("failed to create build branch: {}", err)));
            }
            return Ok(BranchResult { branch: branch_name, created: true, previous_branch: None });
        }

        self.git(&["checkout", &branch_name]).await?;
        Ok(BranchResult { branch: branch_name, created: false, previous_branch: None })
    }

    /// Stage and commit an artifact, auto-generating a message from its
    /// name/kind/hash when none is given.
    pub async fn commit_artifact(
        &self,
        name: &str,
        kind: &str,
        files: &[String],
        hash: &str,
        message: Option<&str>,
    ) -> Result<CommitResult> {
        let message = message.map(str::to_string).unwrap_or_else(|| {
            let mut m = format!("artifact({}): {}", kind, name);
            if !hash.is_empty() {
                m.push_str(&format!(" [{}]", &hash[..hash.len().min(16)]));
            }
            m
        });

        if files.is_empty() {
            self.git(&["add", "-A"]).await?;
        } else {
            for f in files {
                if self.root.join(f).exists() {
                    self.git(&["add", f]).await?;
                }
            }
        }

        let (nothing_staged, _, _) = self.git(&["diff", "--cached", "--quiet"]).await?;
        if nothing_staged {
            return Ok(CommitResult { sha: None, message: "nothing to commit".into(), branch: self.current_branch().await });
        }

        let (ok, _, err) = self.git(&["commit", "-m", &message]).await?;
        if !ok {
            return Err(Error::GitError(format!("commit failed: {}", err)));
        }

        let (_, sha, _) = self.git(&["rev-parse", "HEAD"]).await?;
        Ok(CommitResult { sha: Some(sha), message, branch: self.current_branch().await })
    }

    /// Write a trace to `training/traces/<run_id>.json` and commit it.
    pub async fn commit_trace(&self, run_id: &str, intent: &str, tasks_completed: u32, tasks_decomposed: u32, trace_json: &str) -> Result<CommitResult> {
        let trace_dir = self.root.join("training").join("traces");
        tokio::fs::create_dir_all(&trace_dir).await?;
        let trace_file = trace_dir.join(format!("{}.json", run_id));
        tokio::fs::write(&trace_file, trace_json).await?;

        let rel_path = trace_file.strip_prefix(&self.root).unwrap_or(&trace_file).to_string_lossy().to_string();
        self.git(&["add", &rel_path]).await?;

        let message = format!("trace: {} ({}/{} tasks)", intent, tasks_completed, tasks_decomposed);
        let (ok, _, err) = self.git(&["commit", "-m", &message]).await?;
        if !ok {
            return Err(Error::GitError(format!("commit failed: {}", err)));
        }

        let (_, sha, _) = self.git(&["rev-parse", "HEAD"]).await?;
        Ok(CommitResult { sha: Some(sha), message, branch: self.current_branch().await })
    }

    /// Commits touching `files`, newest first, capped at `limit`.
    pub async fn log_for_node(&self, files: &[String], limit: usize) -> Result<Vec<LoggedCommit>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let max_count = format!("--max-count={}", limit);
        let mut args = vec!["log", max_count.as_str(), "--format=%H|%s|%aI", "--"];
        args.extend(files.iter().map(String::as_str));
        let (ok, out, _) = self.git(&args).await?;
        if !ok || out.is_empty() {
            return Ok(Vec::new());
        }
        Ok(out
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, '|');
                Some(LoggedCommit {
                    sha: parts.next()?.to_string(),
                    message: parts.next()?.to_string(),
                    date: parts.next()?.to_string(),
                })
            })
            .collect())
    }

    /// Diffstat between `main` and a blueprint's design branch.
    pub async fn diff_blueprint(&self, blueprint_id: &str) -> Result<BranchDiff> {
        let branch_name = format!("design/{}", slugify(blueprint_id));
        if !self.branch_exists(&branch_name).await {
            return Err(Error::GitError(format!("branch {} not found", branch_name)));
        }
        let range = format!("main...{}", branch_name);
        let (ok, out, _) = self.git(&["diff", "--stat", &range]).await?;
        if !ok {
            return Err(Error::GitError("could not compute diff".into()));
        }
        let lines: Vec<&str> = if out.trim().is_empty() { Vec::new() } else { out.lines().collect() };
        let files_changed = lines.len().saturating_sub(1);
        Ok(BranchDiff { branch: branch_name, files_changed, diff_stat: out })
    }

    /// Local branches, optionally filtered by a glob `pattern` (e.g. `"design/*"`).
    pub async fn branches(&self, pattern: Option<&str>) -> Result<Vec<BranchInfo>> {
        let fmt = "--format=%(refname:short)|%(HEAD)|%(objectname:short)|%(subject)";
        let list_arg;
        let mut args = vec!["branch", fmt];
        if let Some(p) = pattern {
            list_arg = format!("--list={}", p);
            args.push(&list_arg);
        }
        let (ok, out, _) = self.git(&args).await?;
        if !ok || out.is_empty() {
            return Ok(Vec::new());
        }
        Ok(out
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(4, '|');
                Some(BranchInfo {
                    name: parts.next()?.to_string(),
                    current: parts.next()? == "*",
                    sha: parts.next()?.to_string(),
                    message: parts.next()?.to_string(),
                })
            })
            .collect())
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
