#[cfg(test)]
mod tests;

pub mod interactive;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::chunker::ChunkerConfig;

pub use interactive::{run_interactive_config, show_config};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunker: ChunkerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
        }
    }
}

/// Sliding-window rate limit applied before every embedding API call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    #[inline]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid max chunk size: {0} (must be between 200 and 8192)")]
    InvalidMaxChunkSize(usize),
    #[error("Repack chunk size ({0}) must not be smaller than max chunk size ({1})")]
    RepackChunkSizeTooSmall(usize, usize),
    #[error("Invalid minimum fragment length: {0} (must be between 1 and 1024)")]
    InvalidMinFragmentLen(usize),
    #[error("Invalid oversize factor: {0} (must be between 1.0 and 4.0)")]
    InvalidOversizeFactor(f64),
    #[error("Invalid rate limit: {0} requests per {1}s window")]
    InvalidRateLimit(u32, u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `<config_dir>/config.toml`, falling back to
    /// defaults when no file exists yet.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                ollama: OllamaConfig::default(),
                chunker: ChunkerConfig::default(),
                rate_limit: RateLimitConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the default platform config directory.
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_dir()?)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.validate_chunker_config()?;

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit(
                self.rate_limit.max_requests,
                self.rate_limit.window_seconds,
            ));
        }

        Ok(())
    }

    fn validate_chunker_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunker;

        if !(200..=8192).contains(&config.max_chunk_size) {
            return Err(ConfigError::InvalidMaxChunkSize(config.max_chunk_size));
        }

        if config.repack_chunk_size < config.max_chunk_size {
            return Err(ConfigError::RepackChunkSizeTooSmall(
                config.repack_chunk_size,
                config.max_chunk_size,
            ));
        }

        if !(1..=1024).contains(&config.min_fragment_len) {
            return Err(ConfigError::InvalidMinFragmentLen(config.min_fragment_len));
        }

        if !(1.0..=4.0).contains(&config.oversize_factor) {
            return Err(ConfigError::InvalidOversizeFactor(config.oversize_factor));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Path for the SQLite document registry.
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join("registry.db")
    }

    /// Path for the LanceDB vector database directory.
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }
}

impl OllamaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        self.ollama_url().map(|_| ())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

/// Platform config directory for bookrag (e.g. `~/.config/bookrag`).
#[inline]
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("bookrag"))
        .context("Could not determine platform config directory")
}
