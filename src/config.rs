use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding `search.endpoint`
pub const ENDPOINT_ENV: &str = "DICTAG_SEARCH_ENDPOINT";

/// Errors reading an explicitly requested config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub tagging: TaggingConfig,
    pub loader: LoaderConfig,
    pub languages: LanguageConfig,
    pub logging: LoggingConfig,
}

/// Search service connection and index layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the Elasticsearch-compatible service.
    pub endpoint: String,
    /// Dictionary indexes are named `{index_prefix}-{dic}-{lang}`.
    pub index_prefix: String,
    pub request_timeout_secs: u64,
    /// Pause after creating an index before writing to it.
    pub settle_delay_ms: u64,
    pub shards: u32,
    pub replicas: u32,
}

/// Tagging fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingConfig {
    /// Vocabulary entries recalled per text.
    pub candidate_limit: usize,
    /// Batches smaller than this are tagged sequentially.
    pub parallel_threshold: usize,
    /// Concurrent texts; twice the CPU count when unset.
    pub workers: Option<usize>,
}

/// Vocabulary loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Bulk requests larger than this are split and sent concurrently.
    pub bulk_chunk_size: usize,
}

/// Languages with a dedicated analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub supported: Vec<String>,
    /// Analyzer for the `voc` field of unsupported languages.
    pub fallback_analyzer: String,
    /// Analyzer for the `ngrams` field; keeps each sub-phrase whole.
    pub verbatim_analyzer: String,
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Also write daily-rotated JSON logs here.
    pub log_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            index_prefix: "dictionary".to_string(),
            request_timeout_secs: 30,
            settle_delay_ms: 1000,
            shards: 1,
            replicas: 0,
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            candidate_limit: 100,
            parallel_threshold: 10,
            workers: None,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            bulk_chunk_size: 1000,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        let supported = [
            "arabic", "armenian", "basque", "bengali", "brazilian", "bulgarian", "catalan",
            "cjk", "czech", "danish", "dutch", "english", "estonian", "finnish", "french",
            "galician", "german", "greek", "hindi", "hungarian", "indonesian", "irish",
            "italian", "latvian", "lithuanian", "norwegian", "persian", "portuguese",
            "romanian", "russian", "sorani", "spanish", "swedish", "turkish", "thai",
        ];
        Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            fallback_analyzer: "standard".to_string(),
            verbatim_analyzer: "keyword".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/dictag/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let config = match std::fs::read_to_string(&config_path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}; using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}; using defaults",
                    config_path.display()
                );
                Self::default()
            }
        };
        config.with_env_overrides()
    }

    /// Load a config file the user named explicitly. Unlike [`load`](Self::load)
    /// a missing or broken file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_toml_str(&contents)?.with_env_overrides())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                log::debug!("Search endpoint overridden by {}", ENDPOINT_ENV);
                self.search.endpoint = endpoint.trim().to_string();
            }
        }
        self
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("dictag").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
