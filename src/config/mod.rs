//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML
//! file, and `ARXIV_MIND_*` environment variables (sections separated by a
//! double underscore, e.g. `ARXIV_MIND_SERVER__BASE_URL`).

mod file_config;

pub use file_config::{render_config, save_config, ConfigFileError};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::SortMode;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "ARXIV_MIND";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "arxiv-mind.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Research server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Stream decoding behaviour
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Result presentation defaults
    #[serde(default)]
    pub display: DisplayConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Research server connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the research server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the streaming research endpoint, relative to `base_url`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Total request timeout in seconds, including reading the stream (0 disables)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_endpoint() -> String {
    "api/research".to_string()
}

fn default_timeout() -> u64 {
    600 // reranking with a language model is slow
}

fn default_connect_timeout() -> u64 {
    10
}

/// Stream decoding settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Fail the session on an unparsable `result` line instead of dropping it
    #[serde(default)]
    pub strict_results: bool,
}

/// Result presentation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Sort order for papers
    #[serde(default)]
    pub sort: SortMode,

    /// Hide papers scoring below this (0 shows everything)
    #[serde(default)]
    pub min_score: f64,

    /// Maximum number of papers to print
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Print the publication timeline after the results
    #[serde(default)]
    pub timeline: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            min_score: 0.0,
            limit: None,
            timeline: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for human-readable text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case("json"))
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    settings.try_deserialize()
}

/// Get the configuration from defaults and environment variables only
pub fn get_config() -> Result<Config, config::ConfigError> {
    config::Config::builder()
        .add_source(environment())
        .build()?
        .try_deserialize()
}

/// Default location of the user configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arxiv-mind").join("config.toml"))
}

/// Find a configuration file: `./arxiv-mind.toml`, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    default_config_path().filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:8000");
        assert_eq!(config.server.endpoint, "api/research");
        assert!(!config.decoder.strict_results);
        assert_eq!(config.display.sort, SortMode::Score);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_load_partial_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
base_url = "https://mind.example.org"
timeout_secs = 120

[decoder]
strict_results = true

[display]
sort = "date"
min_score = 6.5
limit = 5

[logging]
format = "json"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.server.base_url, "https://mind.example.org");
        assert_eq!(config.server.timeout_secs, 120);
        assert_eq!(config.server.endpoint, "api/research");
        assert_eq!(config.server.connect_timeout_secs, 10);
        assert!(config.decoder.strict_results);
        assert_eq!(config.display.sort, SortMode::Date);
        assert_eq!(config.display.min_score, 6.5);
        assert_eq!(config.display.limit, Some(5));
        assert!(config.logging.is_json());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(load_config(Path::new("/nonexistent/arxiv-mind.toml")).is_err());
    }
}
