//! Process configuration.
//!
//! Layered with Figment: built-in defaults, then a TOML file (`clinicalkey.toml` unless a path is
//! given), then `CKA_*` environment variables with nested keys split on `__`
//! (e.g. `CKA_RETRIEVAL__TOP_K=5`). Credentials are read separately, see [`Credentials`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::SourceKind;
use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_FILE: &str = "clinicalkey.toml";
pub const ENV_PREFIX: &str = "CKA_";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationProvider {
    Gemini,
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl GenerationProvider {
    pub fn credential_env(self) -> &'static str {
        match self {
            GenerationProvider::Gemini => "GEMINI_API_KEY",
            GenerationProvider::HuggingFace => "HF_TOKEN",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    Lexical,
    Semantic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    pub primary_model: String,
    pub allowed_models: BTreeSet<String>,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    /// Model served by the local Ollama instance; `None` disables the local fallback tier.
    pub local_fallback_model: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Gemini,
            primary_model: "gemini-1.5-flash".to_string(),
            allowed_models: ["gemini-1.5-flash", "gemini-1.5-pro"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            max_output_tokens: 512,
            timeout_secs: 60,
            local_fallback_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: u32,
    pub corpus_path: PathBuf,
    pub index: IndexKind,
    pub embedding_model: String,
    pub sources: BTreeSet<SourceKind>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            corpus_path: PathBuf::from("data/docs.jsonl"),
            index: IndexKind::Lexical,
            embedding_model: "all-minilm".to_string(),
            sources: [SourceKind::LocalDocs, SourceKind::ExternalLiterature]
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LiteratureConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    pub ollama: OllamaConfig,
    pub literature: LiteratureConfig,
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new("CONFIG_INVALID", message)
}

impl Configuration {
    /// Defaults only; callers merge their own providers on top.
    pub fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
    }

    /// Defaults, the TOML file and `CKA_*` environment variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::base_figment()
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate. An explicitly given path must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        if let Some(p) = path {
            if !p.exists() {
                return Err(AppError::new("CONFIG_FILE_MISSING", "Configuration file not found")
                    .with_details(format!("path={}", p.display())));
            }
        }
        Self::from_figment(Self::figment(path))
    }

    pub fn from_figment(figment: Figment) -> AppResult<Self> {
        let cfg: Configuration = figment.extract().map_err(|e| {
            invalid("Failed to read configuration").with_details(e.to_string())
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<()> {
        let g = &self.generation;
        if g.allowed_models.is_empty() {
            return Err(invalid("generation.allowed_models must not be empty"));
        }
        if g.allowed_models.iter().any(|m| m.trim().is_empty()) {
            return Err(invalid("generation.allowed_models contains a blank model id"));
        }
        self.ensure_model_allowed(&g.primary_model)?;
        if g.max_output_tokens == 0 {
            return Err(invalid("generation.max_output_tokens must be at least 1"));
        }
        if g.timeout_secs == 0 || self.ollama.timeout_secs == 0 || self.literature.timeout_secs == 0 {
            return Err(invalid("timeouts must be at least 1 second"));
        }
        if let Some(m) = &g.local_fallback_model {
            if m.trim().is_empty() {
                return Err(invalid("generation.local_fallback_model must not be blank when set"));
            }
        }

        let r = &self.retrieval;
        if r.top_k == 0 {
            return Err(invalid("retrieval.top_k must be at least 1"));
        }
        if r.sources.is_empty() {
            return Err(invalid("retrieval.sources must enable at least one source"));
        }
        if r.index == IndexKind::Semantic && r.embedding_model.trim().is_empty() {
            return Err(invalid("retrieval.embedding_model is required for the semantic index"));
        }
        Ok(())
    }

    /// Reject a model id outside the allow-list. Called before any network traffic.
    pub fn ensure_model_allowed(&self, model: &str) -> AppResult<()> {
        if self.generation.allowed_models.contains(model) {
            return Ok(());
        }
        let allowed = self
            .generation
            .allowed_models
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::new("CONFIG_MODEL_NOT_ALLOWED", "Model is not in the allow-list")
            .with_details(format!("model={model}; allowed=[{allowed}]")))
    }

    pub fn source_enabled(&self, source: SourceKind) -> bool {
        self.retrieval.sources.contains(&source)
    }
}

/// API credential for the configured generation provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("api_key", &"<redacted>").finish()
    }
}

impl Credentials {
    /// Read the provider's credential from the process environment. Absence is a startup error.
    pub fn from_env(provider: GenerationProvider) -> AppResult<Self> {
        Self::from_lookup(provider, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(provider: GenerationProvider, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = provider.credential_env();
        match lookup(name).map(|v| v.trim().to_string()) {
            Some(key) if !key.is_empty() => Ok(Self { api_key: key }),
            _ => Err(AppError::new(
                "CONFIG_MISSING_CREDENTIAL",
                "Generation API credential not found in environment",
            )
            .with_details(format!("variable={name}"))),
        }
    }
}
