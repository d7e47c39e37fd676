//! Configuration management for stixtract.
//!
//! Settings come from a config file (explicit `--config`, else whatever
//! `prefer` discovers for `stixtract` in the standard locations), then
//! environment overrides for the LLM section, then CLI flags applied by the
//! command handlers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chunking::{ChunkError, Chunker, DEFAULT_CHUNK_SIZE};
use crate::llm::LlmConfig;
use crate::ocr::OcrConfig;
use crate::services::{ChunkErrorPolicy, ValidationMode};

/// Name config discovery searches for (`stixtract.toml`, `stixtract.json`, ...).
pub const CONFIG_NAME: &str = "stixtract";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    ChunkSize(#[from] ChunkError),

    #[error("{0}")]
    Invalid(String),
}

/// Options controlling where configuration is loaded from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file; must exist when set.
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths from the working directory instead of the config file's directory.
    pub use_cwd: bool,
}

/// Runtime settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// PDF to process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// Annotation output file
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Behavior when a chunk fails
    #[serde(default)]
    pub on_chunk_error: ChunkErrorPolicy,
    /// STIX response validation
    #[serde(default)]
    pub validation: ValidationMode,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("stix_output.txt")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_path: None,
            output_path: default_output_path(),
            chunk_size: default_chunk_size(),
            on_chunk_error: ChunkErrorPolicy::default(),
            validation: ValidationMode::default(),
            llm: LlmConfig::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings from the discovered config file and the environment.
    pub async fn load(options: &LoadOptions) -> Result<Self, ConfigError> {
        let path = match &options.config_path {
            Some(p) => Some(p.clone()),
            None => discover_config_file().await,
        };

        let mut settings = match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let mut settings = Self::from_file(&path).await?;
                if !options.use_cwd {
                    if let Some(base) = path.parent() {
                        settings.resolve_relative_to(base);
                    }
                }
                settings
            }
            None => Self::default(),
        };

        settings.llm = settings.llm.with_env_overrides();
        settings.expand_paths();
        Ok(settings)
    }

    /// Parse a config file without applying overrides.
    ///
    /// JSON files are parsed as JSON; anything else as TOML.
    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
            _ => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// The configured chunker, rejecting a zero size.
    pub fn chunker(&self) -> Result<Chunker, ConfigError> {
        Ok(Chunker::new(self.chunk_size)?)
    }

    /// The source PDF, which must be configured.
    pub fn source(&self) -> Result<&Path, ConfigError> {
        self.source_path.as_deref().ok_or_else(|| {
            ConfigError::Invalid(
                "No source PDF given (pass one on the command line or set source_path)".to_string(),
            )
        })
    }

    /// Check everything that can be checked before the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker()?;
        self.source()?;

        if let Some(dir) = self.output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "Output directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }

    /// Copy safe to print: secrets are masked.
    pub fn redacted(&self) -> Self {
        Self {
            llm: self.llm.redacted(),
            ..self.clone()
        }
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Make file paths relative to `base` (the config file's directory).
    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.starts_with("~") {
                *p = base.join(&*p);
            }
        };
        if let Some(p) = self.source_path.as_mut() {
            resolve(p);
        }
        resolve(&mut self.output_path);
        if let Some(p) = self.llm.api_key_file.as_mut() {
            resolve(p);
        }
    }

    /// Expand `~` and environment variables in paths.
    fn expand_paths(&mut self) {
        for path in [
            self.source_path.as_mut(),
            Some(&mut self.output_path),
            self.llm.api_key_file.as_mut(),
            self.ocr.tools.poppler_path.as_mut(),
            self.ocr.tools.tesseract_cmd.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            *path = expand_path(path);
        }
    }
}

/// Expand `~` and `$VARS` in a path, leaving it unchanged if expansion fails.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => shellexpand::full(s)
            .map(|expanded| PathBuf::from(expanded.as_ref()))
            .unwrap_or_else(|_| path.to_path_buf()),
        None => path.to_path_buf(),
    }
}

/// Find a config file in the standard locations.
async fn discover_config_file() -> Option<PathBuf> {
    match prefer::load(CONFIG_NAME).await {
        Ok(found) => found.source_path().map(|p| p.to_path_buf()),
        // No config file found, use defaults with env overrides
        Err(_) => None,
    }
}
