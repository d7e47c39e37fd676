//! LLM client configuration.
//!
//! Read from the `[llm]` table of the config file, then overridden by env vars:
//! LLM_PROVIDER, LLM_ENDPOINT, LLM_MODEL, LLM_API_KEY, LLM_API_KEY_FILE,
//! LLM_API_VERSION, LLM_MAX_TOKENS, LLM_TEMPERATURE, LLM_MAX_RETRIES, LLM_PROMPT.
//! Provider-native key vars (AZURE_OPENAI_API_KEY, OPENAI_API_KEY) are used
//! when no key was configured explicitly.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_STIX_PROMPT;
use super::LlmError;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    #[default]
    OpenAI,
    /// Azure OpenAI deployment
    Azure,
    /// Ollama API (local)
    Ollama,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            "azure" | "azure-openai" => Some(Self::Azure),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Ollama => "ollama",
        }
    }

    /// Whether requests need an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com"),
            Self::Ollama => Some("http://localhost:11434"),
            // Azure endpoints are per-resource
            Self::Azure => None,
        }
    }

    fn key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Azure => Some("AZURE_OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for LLM client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider (openai, azure or ollama)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply; required for Azure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Model name, or deployment name for Azure
    #[serde(default = "default_model")]
    pub model: String,
    /// Azure OpenAI API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// File whose trimmed contents are the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation; provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Custom annotation prompt (uses the {content} placeholder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Retries for transient failures (connection errors, 429, 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            endpoint: None,
            model: default_model(),
            api_version: default_api_version(),
            api_key: None,
            api_key_file: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            prompt: None,
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER").and_then(|v| LlmProvider::from_str(&v)) {
            self.provider = provider;
        }

        if let Some(endpoint) = lookup("LLM_ENDPOINT") {
            self.endpoint = Some(endpoint);
        } else if self.provider == LlmProvider::Azure && self.endpoint.is_none() {
            self.endpoint = lookup("AZURE_OPENAI_ENDPOINT");
        }

        // Explicit key settings always win
        if let Some(key) = lookup("LLM_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(path) = lookup("LLM_API_KEY_FILE") {
            self.api_key_file = Some(PathBuf::from(path));
        }
        if self.api_key.is_none() && self.api_key_file.is_none() {
            if let Some(var) = self.provider.key_env_var() {
                self.api_key = lookup(var);
            }
        }

        if let Some(model) = lookup("LLM_MODEL") {
            self.model = model;
        }
        if let Some(version) = lookup("LLM_API_VERSION") {
            self.api_version = version;
        }
        if let Some(n) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(t) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = Some(t);
        }
        if let Some(n) = lookup("LLM_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.max_retries = n;
        }
        if let Some(prompt) = lookup("LLM_PROMPT") {
            self.prompt = Some(prompt);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Get the annotation prompt, using custom or default.
    pub fn get_prompt(&self) -> &str {
        self.prompt.as_deref().unwrap_or(DEFAULT_STIX_PROMPT)
    }

    /// Endpoint without a trailing slash, falling back to the provider default.
    pub fn resolved_endpoint(&self) -> Result<String, LlmError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .or_else(|| self.provider.default_endpoint())
            .ok_or_else(|| {
                LlmError::Config(format!(
                    "{} provider requires llm.endpoint (or LLM_ENDPOINT)",
                    self.provider
                ))
            })?;
        Ok(endpoint.trim_end_matches('/').to_string())
    }

    /// The API key from config, key file or environment.
    ///
    /// Returns `Ok(None)` only for providers that don't authenticate.
    pub fn resolve_api_key(&self) -> Result<Option<String>, LlmError> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(Some(key.trim().to_string()));
        }

        if let Some(path) = &self.api_key_file {
            let key = std::fs::read_to_string(path).map_err(|e| {
                LlmError::MissingCredentials(format!(
                    "cannot read API key file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(LlmError::MissingCredentials(format!(
                    "API key file {} is empty",
                    path.display()
                )));
            }
            return Ok(Some(key.to_string()));
        }

        match self.provider.key_env_var() {
            Some(var) => Err(LlmError::MissingCredentials(format!(
                "set llm.api_key, llm.api_key_file, LLM_API_KEY or {}",
                var
            ))),
            None => Ok(None),
        }
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.api_key.is_some() {
            config.api_key = Some("********".to_string());
        }
        config
    }
}
