//! Layered configuration loader and the typed settings it produces.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with `__`, e.g. `APP_RETRIEVAL__TOP_N=8`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        self.settings()
            .map_err(|e| anyhow::anyhow!("Invalid configuration for env '{}': {}", env, e))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
    pub store: StoreSettings,
    pub retrieval: RetrievalSettings,
    pub chat: ChatSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        let r = &self.retrieval;
        if r.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.top_n must be > 0".into()));
        }
        if r.search_limit == 0 {
            return Err(Error::InvalidConfig("retrieval.search_limit must be > 0".into()));
        }
        if r.max_concurrency == 0 {
            return Err(Error::InvalidConfig("retrieval.max_concurrency must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&r.blend_weight) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.blend_weight must be within [0, 1], got {}",
                r.blend_weight
            )));
        }
        if self.llm.max_retries == 0 {
            return Err(Error::InvalidConfig("llm.max_retries must be > 0".into()));
        }
        if self.llm.default_model.trim().is_empty() {
            return Err(Error::InvalidConfig("llm.default_model must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible API root, e.g. an Ollama `/v1` endpoint.
    pub base_url: String,
    pub api_key: String,
    pub default_model: String,
    /// Attempts per structured call site before its fallback is used.
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: "ollama".to_string(),
            default_model: "llama3.2".to_string(),
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub url: String,
    pub normalize: bool,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { url: "http://127.0.0.1:8008/embed".to_string(), normalize: true, timeout_secs: 120 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { url: "http://127.0.0.1:8009/rank".to_string(), timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub url: String,
    pub api_key: String,
    pub collection: String,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            api_key: String::new(),
            collection: "WikiChunk".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Hits requested from hybrid search per query.
    pub search_limit: usize,
    /// Lexical/vector blend passed to hybrid search.
    pub blend_weight: f32,
    /// Deduplicated chunks kept before neighbor expansion.
    pub top_n: usize,
    pub neighbor_expansion: bool,
    /// Queries embedded, searched and reranked at the same time.
    pub max_concurrency: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { search_limit: 10, blend_weight: 0.5, top_n: 6, neighbor_expansion: true, max_concurrency: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self { request_timeout_secs: 180 }
    }
}

impl ChatSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
