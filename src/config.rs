//! TOML configuration.
//!
//! Every section except `[index]` has defaults, so the smallest valid file is:
//!
//! ```toml
//! [index]
//! persist_dir = "faiss_store"
//! ```
//!
//! API keys are never stored here: `api_key_env` names the environment
//! variable an adapter reads at construction time.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub web_search: WebSearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding `index.bin` and `metadata.json`.
    pub persist_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl RetrievalConfig {
    pub fn top_k(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.top_k).context("retrieval.top_k must be >= 1")
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
            url: None,
            api_key_env: default_openai_key_env(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}
fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_provider")]
    pub provider: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Base URL override; the provider's public endpoint otherwise.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_groq_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            model: default_completion_model(),
            url: None,
            api_key_env: default_groq_key_env(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    /// Base URL of the OpenAI-compatible API (no trailing slash).
    pub fn base_url(&self) -> Result<String> {
        let url = match (&self.url, self.provider.as_str()) {
            (Some(url), _) => url.clone(),
            (None, "groq") => "https://api.groq.com/openai/v1".to_string(),
            (None, "openai") => "https://api.openai.com/v1".to_string(),
            (None, other) => bail!("completion.url is required for provider '{}'", other),
        };
        Ok(url.trim_end_matches('/').to_string())
    }
}

fn default_completion_provider() -> String {
    "groq".to_string()
}
fn default_completion_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_groq_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_completion_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            url: None,
            api_key_env: default_tavily_key_env(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_search_provider() -> String {
    "tavily".to_string()
}
fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".to_string()
}
fn default_max_results() -> usize {
    5
}
fn default_search_timeout_secs() -> u64 {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            root: default_ingest_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_ingest_root() -> PathBuf {
    PathBuf::from("data")
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
        "**/*.pdf".to_string(),
    ]
}
fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Pause between streamed words, in milliseconds.
    #[serde(default = "default_stream_delay_ms")]
    pub stream_delay_ms: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            stream_delay_ms: default_stream_delay_ms(),
        }
    }
}

fn default_stream_delay_ms() -> u64 {
    90
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.ingest.max_tokens == 0 {
        bail!("ingest.max_tokens must be > 0");
    }

    match config.embedding.provider.as_str() {
        "hash" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be hash, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }

    match config.completion.provider.as_str() {
        "groq" | "openai" | "openai-compatible" => {}
        other => bail!(
            "Unknown completion provider: '{}'. Must be groq, openai, or openai-compatible.",
            other
        ),
    }
    config.completion.base_url()?;

    if config.web_search.provider != "tavily" {
        bail!(
            "Unknown web search provider: '{}'. Must be tavily.",
            config.web_search.provider
        );
    }
    if config.web_search.timeout_secs == 0 || config.completion.timeout_secs == 0 {
        bail!("timeout_secs must be > 0");
    }

    Ok(config)
}
