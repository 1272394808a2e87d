//! Application configuration for treesum.
//!
//! User config lives at `~/.treesum/treesum.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SynthesisError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "treesum.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".treesum";

// ---------------------------------------------------------------------------
// Config structs (matching treesum.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reducer settings.
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Per-model token prices, keyed by model identifier.
    #[serde(default)]
    pub pricing: BTreeMap<String, ModelPricing>,
}

/// `[synthesizer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    /// Model identifier passed to the invoker.
    #[serde(default = "default_model")]
    pub model: String,

    /// Number of units combined into one prompt.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Dispatch the batches of a round concurrently.
    #[serde(default)]
    pub parallel: bool,

    /// Override for the question-answering template (`{question}`, `{context}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_prompt: Option<String>,

    /// Override for the summary template (`{question}`, `{answers}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_prompt: Option<String>,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            batch_size: default_batch_size(),
            parallel: false,
            qa_prompt: None,
            summary_prompt: None,
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo-1106".into()
}
fn default_batch_size() -> usize {
    2
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    60
}

/// `[pricing."<model>"]` entry. Prices are USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub prompt_per_mtok: f64,
    pub completion_per_mtok: f64,
}

impl ModelPricing {
    /// Cost of a single call with the given token usage.
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.prompt_per_mtok
            + completion_tokens as f64 * self.completion_per_mtok)
            / 1_000_000.0
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.treesum/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SynthesisError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.treesum/treesum.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SynthesisError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SynthesisError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to `path`, or to `~/.treesum/treesum.toml`
/// when `path` is `None`. Missing parent directories are created and an
/// existing file is overwritten. Returns the path written.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| SynthesisError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SynthesisError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SynthesisError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the OpenRouter API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SynthesisError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
