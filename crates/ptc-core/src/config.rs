//! Engine configuration: built-in defaults, overridden by `ptc.toml`, then
//! by `PTC_*` environment variables — mirroring the original implementation's
//! `os.environ.get(NAME, default)` pattern for the Embedding Index and
//! Content Store (`ptc/embeddings.py::_load_config`, `ptc/ipfs.py::_load_config`).

use serde::{Deserialize, Serialize};

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub model: String,
    pub dim: usize,
    pub api: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("PTC_EMBEDDING_ENABLED", false),
            model: env_string("PTC_EMBEDDING_MODEL", "all-MiniLM-L6-v2"),
            dim: env_usize("PTC_EMBEDDING_DIM", 384),
            api: env_string("PTC_EMBEDDING_API", "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub enabled: bool,
    pub api: String,
    pub gateway: String,
    pub pin_service: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("PTC_OBJECT_STORE_ENABLED", false),
            api: env_string("PTC_OBJECT_STORE_API", "http://localhost:5001"),
            gateway: env_string("PTC_OBJECT_STORE_GATEWAY", "http://localhost:8080"),
            pin_service: env_string("PTC_OBJECT_STORE_PIN_SERVICE", "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    pub enabled: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("PTC_GIT_ENABLED", true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCliConfig {
    pub enabled: bool,
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for LlmCliConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("PTC_LLM_CLI_ENABLED", false),
            command: env_string("PTC_LLM_CLI_COMMAND", "claude"),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub llm_cli: LlmCliConfig,
    /// Worker-pool size for EXECUTE's within-tier parallelism (spec.md §5).
    /// 1 means strictly sequential, matching the original implementation.
    #[serde(default = "default_max_parallel")]
    pub execute_max_parallel: usize,
}

fn default_max_parallel() -> usize {
    env_usize("PTC_EXECUTE_MAX_PARALLEL", 1)
}

impl Config {
    /// Load defaults, then merge an optional `ptc.toml` from `dir`. A
    /// present field in `ptc.toml` overrides the default; environment
    /// variables are consulted per-field by each `Default` impl above and
    /// take precedence, since `toml::from_str` only fills in fields the file
    /// actually sets and we call it after the env-aware `Default::default()`.
    /// A missing or malformed `ptc.toml` falls back to defaults — config is
    /// an ambient concern, never a hard run failure.
    pub fn load(dir: impl AsRef<std::path::Path>) -> Self {
        let path = dir.as_ref().join("ptc.toml");
        let base = Config::default();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<PartialConfig>(&contents) {
                Ok(partial) => partial.merge_onto(base),
                Err(e) => {
                    tracing::warn!("ignoring malformed ptc.toml: {}", e);
                    base
                }
            },
            Err(_) => base,
        }
    }
}

/// Mirrors `Config` with every field optional, so a `ptc.toml` only needs to
/// name the settings it wants to override.
#[derive(Debug, Clone, Deserialize, Default)]
struct PartialConfig {
    embedding: Option<EmbeddingConfig>,
    object_store: Option<ObjectStoreConfig>,
    git: Option<GitConfig>,
    llm_cli: Option<LlmCliConfig>,
    execute_max_parallel: Option<usize>,
}

impl PartialConfig {
    fn merge_onto(self, base: Config) -> Config {
        Config {
            embedding: self.embedding.unwrap_or(base.embedding),
            object_store: self.object_store.unwrap_or(base.object_store),
            git: self.git.unwrap_or(base.git),
            llm_cli: self.llm_cli.unwrap_or(base.llm_cli),
            execute_max_parallel: self.execute_max_parallel.unwrap_or(base.execute_max_parallel),
        }
    }
}
