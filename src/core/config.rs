//! catalog-search configuration module
//!
//! Config loading priority:
//! 1. File named by `CATALOG_SEARCH_CONFIG`
//! 2. `./catalog-search.json`
//! 3. Built-in defaults
//!
//! API keys are taken from `OPENAI_API_KEY` / `PINECONE_API_KEY` when set,
//! overriding whatever the file holds.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::search::EntityKind;

pub const CONFIG_ENV: &str = "CATALOG_SEARCH_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "catalog-search.json";
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub pinecone: PineconeConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub ingest: IngestSettings,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

// ===== OpenAI =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_dimension() -> usize {
    3072
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_tokens() -> u32 {
    600
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            embedding_model: default_embedding_model(),
            dimension: default_dimension(),
            chat_model: default_chat_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

// ===== Pinecone =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Data-plane URL of the property index
    #[serde(default)]
    pub property_host: Option<String>,

    /// Data-plane URL of the company index
    #[serde(default)]
    pub company_host: Option<String>,

    #[serde(default)]
    pub namespace: String,
}

impl PineconeConfig {
    pub fn host_for(&self, kind: EntityKind) -> Option<&str> {
        match kind {
            EntityKind::Property => self.property_host.as_deref(),
            EntityKind::Company => self.company_host.as_deref(),
        }
    }
}

// ===== Backend selection =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    OpenAi,
    Htp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Pinecone,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_embedder_backend")]
    pub embedder: EmbedderBackend,

    #[serde(default = "default_index_backend")]
    pub index: IndexBackend,

    /// Directory holding the local SQLite indexes
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
}

fn default_embedder_backend() -> EmbedderBackend {
    EmbedderBackend::OpenAi
}

fn default_index_backend() -> IndexBackend {
    IndexBackend::Pinecone
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".catalog-search")
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            embedder: default_embedder_backend(),
            index: default_index_backend(),
            local_dir: default_local_dir(),
        }
    }
}

impl BackendConfig {
    /// SQLite file backing the local index for an entity kind
    pub fn local_index_path(&self, kind: EntityKind) -> PathBuf {
        self.local_dir.join(format!("{}.db", kind.plural()))
    }
}

// ===== Search / ingest tuning =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    #[serde(default = "default_reasoning_concurrency")]
    pub reasoning_concurrency: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_max_top_k() -> usize {
    100
}

fn default_reasoning_concurrency() -> usize {
    4
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            reasoning_concurrency: default_reasoning_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    50
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            openai: OpenAiConfig::default(),
            pinecone: PineconeConfig::default(),
            backend: BackendConfig::default(),
            search: SearchSettings::default(),
            ingest: IngestSettings::default(),
        }
    }
}

impl Config {
    /// Load from the configured location, falling back to defaults
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) => match Self::load_from_file(&path) {
                Ok(config) => {
                    if config.version > CONFIG_VERSION {
                        eprintln!(
                            "Warning: Config version {} is newer than supported version {}.",
                            config.version, CONFIG_VERSION
                        );
                    }
                    config
                }
                Err(e) => {
                    eprintln!(
                        "Warning: Failed to load {}: {:#}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env();
        config
    }

    /// Path of the config file that `load` would read, if one exists
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over file values for secrets
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            if !key.is_empty() {
                self.pinecone.api_key = Some(key);
            }
        }
    }
}
