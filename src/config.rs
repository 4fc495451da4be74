use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use crate::error::{CategoryError, Result};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CATEGORY_TREE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Nested JSON seed; the built-in taxonomy is used when unset.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    #[serde(default)]
    pub show_hidden: bool,

    #[serde(default)]
    pub expand_all: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `category_tree=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("category-tree.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// `$CATEGORY_TREE_CONFIG`, else `config.toml` in the platform config dir.
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("", "", "category-tree").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from the default location. A missing file yields the
    /// defaults; an unreadable or invalid one is an error for the caller to
    /// report once logging is up.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| CategoryError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tree.seed_path, None);
        assert!(!config.tree.show_hidden);
        assert_eq!(config.logging.file, PathBuf::from("category-tree.log"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tree]\nshow_hidden = true\nseed_path = \"seed.json\"").unwrap();

        let config = Config::load_from(file.path()).unwrap();

        assert!(config.tree.show_hidden);
        assert!(!config.tree.expand_all);
        assert_eq!(config.tree.seed_path, Some(PathBuf::from("seed.json")));
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tree]\nshow_hidden = \"maybe\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, CategoryError::Config { .. }));
    }

    #[test]
    fn test_load_reports_invalid_file_from_env_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = 3").unwrap();
        std::env::set_var(CONFIG_ENV, file.path());

        let result = Config::load();
        std::env::remove_var(CONFIG_ENV);

        assert!(matches!(result, Err(CategoryError::Config { .. })));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.tree.expand_all = true;
        config.logging.level = "debug".into();

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }
}
