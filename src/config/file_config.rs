//! Writing configuration files.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8000"
//! endpoint = "api/research"
//! timeout_secs = 600
//! connect_timeout_secs = 10
//!
//! [decoder]
//! strict_results = false
//!
//! [display]
//! sort = "score"
//! min_score = 0.0
//! timeline = false
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use super::Config;

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Refusing to overwrite existing file {0}")]
    Exists(String),
}

/// Render a configuration as TOML
pub fn render_config(config: &Config) -> Result<String, ConfigFileError> {
    toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))
}

/// Save a configuration to a TOML file, creating parent directories.
///
/// An existing file is only replaced when `overwrite` is set.
pub fn save_config(config: &Config, path: &Path, overwrite: bool) -> Result<(), ConfigFileError> {
    if path.exists() && !overwrite {
        return Err(ConfigFileError::Exists(path.display().to_string()));
    }
    let content = render_config(config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }
    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use crate::utils::SortMode;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.server.base_url = "https://saved.example.org".to_string();
        config.display.sort = SortMode::Relevance;

        save_config(&config, &path, false).unwrap();
        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.server.base_url, "https://saved.example.org");
        assert_eq!(loaded.display.sort, SortMode::Relevance);
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# keep me").unwrap();

        let result = save_config(&Config::default(), &path, false);
        assert!(matches!(result, Err(ConfigFileError::Exists(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep me");

        save_config(&Config::default(), &path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[server]"));
    }

    #[test]
    fn test_render_default_config() {
        let text = render_config(&Config::default()).unwrap();
        assert!(text.contains("base_url = \"http://localhost:8000\""));
        assert!(text.contains("sort = \"score\""));
        assert!(!text.contains("limit"));
    }
}
