//! Typed application configuration.
//!
//! Everything that used to be an ad hoc environment toggle (rerank on/off,
//! token budgets, model ids) lives here and is handed to each component at
//! construction time. The file is optional: a missing or unreadable
//! `config.yml` falls back to the defaults below.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub rerank: RerankConfig,
    pub generation: GenerationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidate pool handed to the reranker.
    pub pool_size: usize,
    /// Overrides the default `store/base.json` location.
    pub store_path: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            store_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Enables the model-assisted judgment; heuristic scoring otherwise.
    pub enabled: bool,
    /// Final number of passages fed into prompt building.
    pub top_k: usize,
    /// Maximum candidates listed in the judgment prompt.
    pub max_listed: usize,
    /// Token budget for the judgment completion.
    pub max_tokens: u32,
    /// Overrides the generation model for judgments.
    pub model: Option<String>,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            top_k: 3,
            max_listed: 12,
            max_tokens: 256,
            model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    /// Upper bound on every provider call; on expiry the query proceeds
    /// with the deterministic local fallback.
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            temperature: 0.15,
            top_p: 0.95,
            max_tokens: 512,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// Empty list keeps CORS permissive for local development.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

pub fn config_path(paths: &AppPaths) -> PathBuf {
    if let Ok(path) = env::var("MANUALBOT_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    paths.project_root.join("config.yml")
}

pub fn load_config(paths: &AppPaths) -> AppConfig {
    let path = config_path(paths);
    if !path.exists() {
        return AppConfig::default();
    }

    match fs::read_to_string(&path) {
        Ok(contents) => match serde_yaml::from_str::<AppConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    "failed to parse {}: {}; using defaults",
                    path.display(),
                    err
                );
                AppConfig::default()
            }
        },
        Err(err) => {
            tracing::warn!(
                "failed to read {}: {}; using defaults",
                path.display(),
                err
            );
            AppConfig::default()
        }
    }
}

/// API key is never read from the config file.
pub fn groq_api_key() -> Option<String> {
    env::var("GROQ_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
}
