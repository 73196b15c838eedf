use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::chunk::{DEFAULT_OVERLAP_CHARS, DEFAULT_TARGET_CHARS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub docs: DocsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub cohere: CohereConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    /// Root directory of the knowledge base.
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_chars")]
    pub target_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: DEFAULT_TARGET_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
        }
    }
}

fn default_target_chars() -> usize {
    DEFAULT_TARGET_CHARS
}
fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per investigation.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Complaints shorter than this are rejected at the boundary.
    #[serde(default = "default_min_complaint_len")]
    pub min_complaint_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_complaint_len: default_min_complaint_len(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_min_complaint_len() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct CohereConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_embed_model")]
    pub embed_model: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Texts per embed call; the API accepts at most 96.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Total attempts per embedding call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            embed_model: default_embed_model(),
            chat_model: default_chat_model(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.cohere.com".to_string()
}
fn default_embed_model() -> String {
    "embed-english-v3.0".to_string()
}
fn default_chat_model() -> String {
    "command-r-plus".to_string()
}
fn default_batch_size() -> usize {
    96
}
fn default_max_attempts() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.target_chars == 0 {
        anyhow::bail!("chunking.target_chars must be > 0");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.cohere.batch_size == 0 || config.cohere.batch_size > 96 {
        anyhow::bail!("cohere.batch_size must be in 1..=96");
    }

    if config.cohere.max_attempts == 0 {
        anyhow::bail!("cohere.max_attempts must be >= 1");
    }

    Ok(config)
}
