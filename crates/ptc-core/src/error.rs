//! Error taxonomy for the PTC engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("tree not found: {0}")]
    TreeNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("invalid tree: {0}")]
    InvalidTree(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("git error: {0}")]
    GitError(String),

    #[error("codie error: {0}")]
    CodieError(String),

    #[error("{op} timed out after {secs}s")]
    Timeout { op: String, secs: u64 },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound(id.into())
    }

    pub fn invalid_tree(reason: impl Into<String>) -> Self {
        Self::InvalidTree(reason.into())
    }

    pub fn timeout(op: impl Into<String>, secs: u64) -> Self {
        Self::Timeout { op: op.into(), secs }
    }

    /// Whether this error corresponds to the "input error" taxonomy class
    /// (spec.md §7) — the only class that surfaces to the CLI as exit code 1.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::TreeNotFound(_) | Self::NodeNotFound(_) | Self::InvalidTree(_))
    }
}
