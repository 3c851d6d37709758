use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use url::Url;

use super::error::{PeerlensError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EmbeddingProviderKind {
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LlmProviderKind {
    Ollama,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerlensConfig {
    pub llm_provider: String,
    pub llm_model: String,
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f64,

    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,

    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    #[serde(skip_serializing)]
    pub embedding_api_key: Option<String>,

    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,

    pub timeout: u64,
    pub embedding_cache_size: usize,
    pub embedding_cache_ttl: u64,

    /// Optional TOML/JSON file with `AnalysisConfig` overrides.
    pub analysis_config_path: Option<String>,
}

impl PeerlensConfig {
    pub fn new() -> Self {
        Self {
            llm_provider: "openai".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.3,

            llm_fallback_enabled: true,
            llm_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: crate::DEFAULT_LLM_MODEL.to_string(),

            embedding_provider: "ollama".to_string(),
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,

            embedding_fallback_enabled: true,
            embedding_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),

            timeout: 30,
            embedding_cache_size: crate::DEFAULT_CACHE_SIZE,
            embedding_cache_ttl: crate::DEFAULT_CACHE_TTL,

            analysis_config_path: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; `from_env` passes the process environment.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(provider) = lookup("PEERLENS_LLM_PROVIDER") {
            config.llm_provider = provider;
        }
        if let Some(model) = lookup("PEERLENS_LLM_MODEL") {
            config.llm_model = model;
        }
        if let Some(key) = lookup("PEERLENS_LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            config.llm_api_key = Some(key);
        }
        if let Some(url) = lookup("PEERLENS_LLM_BASE_URL") {
            config.llm_base_url = Some(url);
        }
        if let Some(temperature) = lookup("PEERLENS_LLM_TEMPERATURE").and_then(|t| t.parse().ok()) {
            config.llm_temperature = temperature;
        }
        if let Some(enabled) = lookup("PEERLENS_LLM_FALLBACK_ENABLED").and_then(|v| parse_bool(&v)) {
            config.llm_fallback_enabled = enabled;
        }
        if let Some(url) = lookup("PEERLENS_LLM_FALLBACK_URL") {
            config.llm_fallback_url = url;
        }
        if let Some(model) = lookup("PEERLENS_LLM_FALLBACK_MODEL") {
            config.llm_fallback_model = model;
        }
        if let Some(provider) = lookup("PEERLENS_EMBEDDING_PROVIDER") {
            config.embedding_provider = provider;
        }
        if let Some(model) = lookup("PEERLENS_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(url) = lookup("PEERLENS_EMBEDDING_URL") {
            config.embedding_url = url;
        }
        if let Some(key) = lookup("PEERLENS_EMBEDDING_API_KEY") {
            config.embedding_api_key = Some(key);
        }
        if let Some(enabled) = lookup("PEERLENS_EMBEDDING_FALLBACK_ENABLED").and_then(|v| parse_bool(&v)) {
            config.embedding_fallback_enabled = enabled;
        }
        if let Some(url) = lookup("PEERLENS_EMBEDDING_FALLBACK_URL") {
            config.embedding_fallback_url = url;
        }
        if let Some(model) = lookup("PEERLENS_EMBEDDING_FALLBACK_MODEL") {
            config.embedding_fallback_model = model;
        }
        if let Some(timeout) = lookup("PEERLENS_TIMEOUT").and_then(|t| t.parse().ok()) {
            config.timeout = timeout;
        }
        if let Some(size) = lookup("PEERLENS_EMBEDDING_CACHE_SIZE").and_then(|s| s.parse().ok()) {
            config.embedding_cache_size = size;
        }
        if let Some(ttl) = lookup("PEERLENS_EMBEDDING_CACHE_TTL").and_then(|s| s.parse().ok()) {
            config.embedding_cache_ttl = ttl;
        }
        if let Some(path) = lookup("PEERLENS_TUNING_PATH") {
            config.analysis_config_path = Some(path);
        }

        config
    }

    pub fn llm_kind(&self) -> Result<LlmProviderKind> {
        self.llm_provider.parse().map_err(|_| {
            PeerlensError::Config(format!(
                "Unknown LLM provider: {}. Supported: openai, ollama",
                self.llm_provider
            ))
        })
    }

    pub fn embedding_kind(&self) -> Result<EmbeddingProviderKind> {
        self.embedding_provider.parse().map_err(|_| {
            PeerlensError::Config(format!(
                "Unknown embedding provider: {}. Supported: ollama, openai",
                self.embedding_provider
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let llm_kind = self.llm_kind()?;
        let embedding_kind = self.embedding_kind()?;

        check_url("embedding_url", &self.embedding_url)?;
        check_url("embedding_fallback_url", &self.embedding_fallback_url)?;
        check_url("llm_fallback_url", &self.llm_fallback_url)?;
        if let Some(ref url) = self.llm_base_url {
            check_url("llm_base_url", url)?;
        }

        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(PeerlensError::Config(format!(
                "llm_temperature must be within [0, 2], got {}",
                self.llm_temperature
            )));
        }

        if llm_kind == LlmProviderKind::OpenAi && self.llm_api_key.is_none() {
            return Err(PeerlensError::Config(
                "PEERLENS_LLM_API_KEY (or OPENAI_API_KEY) is required for the openai LLM provider".to_string(),
            ));
        }
        if embedding_kind == EmbeddingProviderKind::OpenAi && self.embedding_api_key.is_none() {
            return Err(PeerlensError::Config(
                "PEERLENS_EMBEDDING_API_KEY is required for the openai embedding provider".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PeerlensConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| PeerlensError::Config(format!("{field} is not a valid URL ({value}): {e}")))
}

/// Tunables of the similarity scorer and concept graph builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub batch_size: usize,
    pub top_k: usize,
    pub cooccurrence_step: f64,
    pub cooccurrence_cap: f64,
    pub same_summary_bonus: f64,
    pub edge_weight_floor: f64,
    /// Inclusive lower bound of the ambiguous similarity band.
    pub refinement_min_similarity: f64,
    /// Exclusive upper bound of the ambiguous similarity band.
    pub refinement_max_similarity: f64,
    pub refinement_cap: usize,
    pub verified_boost: f64,
    pub verified_weight_cap: f64,
    pub report_precision: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            top_k: 3,
            cooccurrence_step: 0.1,
            cooccurrence_cap: 0.3,
            same_summary_bonus: 0.2,
            edge_weight_floor: 0.1,
            refinement_min_similarity: 0.2,
            refinement_max_similarity: 0.5,
            refinement_cap: 20,
            verified_boost: 1.2,
            verified_weight_cap: 1.0,
            report_precision: 4,
        }
    }
}

impl AnalysisConfig {
    /// Defaults, then the optional file, then `PEERLENS_ANALYSIS__<FIELD>` variables
    /// (e.g. `PEERLENS_ANALYSIS__TOP_K=5`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PEERLENS_ANALYSIS")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PeerlensError::Validation("batch_size must be positive".to_string()));
        }
        if self.refinement_min_similarity >= self.refinement_max_similarity {
            return Err(PeerlensError::Validation(format!(
                "refinement band is empty: [{}, {})",
                self.refinement_min_similarity, self.refinement_max_similarity
            )));
        }
        if self.cooccurrence_step < 0.0 || self.cooccurrence_cap < 0.0 || self.same_summary_bonus < 0.0 {
            return Err(PeerlensError::Validation(
                "co-occurrence and same-summary bonuses must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn in_refinement_band(&self, similarity: f64) -> bool {
        similarity >= self.refinement_min_similarity && similarity < self.refinement_max_similarity
    }
}
