// ABOUTME: Configuration management for the template engine
// ABOUTME: Loads YAML settings, merges environment overrides and answers dotted-key lookups

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Helpers directory used when configuration does not name one.
pub const DEFAULT_HELPERS_PATH: &str = "workspace/utils/helpers";

/// Lookup key for the helpers directory.
pub const HELPERS_PATH_KEY: &str = "engines.es6.paths.helpers";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engines: EnginesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnginesConfig {
    #[serde(default)]
    pub es6: Es6Config,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Es6Config {
    #[serde(default)]
    pub paths: PathsConfig,

    /// Pre-register the native helpers (`upper`, `json`, `timestamp`, ...).
    #[serde(default = "default_builtin_helpers")]
    pub builtin_helpers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_helpers_path")]
    pub helpers: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

fn default_helpers_path() -> PathBuf {
    PathBuf::from(DEFAULT_HELPERS_PATH)
}

fn default_builtin_helpers() -> bool {
    true
}

impl Default for Es6Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            builtin_helpers: default_builtin_helpers(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            helpers: default_helpers_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            Self::from_yaml(&contents)?
        } else {
            Config::default()
        };

        config.merge_env();
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        let possible_paths = [
            PathBuf::from("es6-templates.yaml"),
            PathBuf::from("es6-templates.yml"),
            PathBuf::from(".es6-templates.yaml"),
            PathBuf::from(".es6-templates.yml"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".es6-templates").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        for path in possible_paths {
            if path.exists() {
                return path;
            }
        }

        // Return default path (may not exist)
        PathBuf::from("es6-templates.yaml")
    }

    /// Merge environment variables into configuration
    pub fn merge_env(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    fn merge_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(helpers) = lookup("ES6_TEMPLATES_HELPERS_PATH") {
            self.engines.es6.paths.helpers = PathBuf::from(helpers);
        }
        if let Some(level) = lookup("ES6_TEMPLATES_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ES6_TEMPLATES_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Look up a dotted key such as `engines.es6.paths.helpers`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let root = serde_json::to_value(self).ok()?;
        key.split('.')
            .try_fold(&root, |node, part| node.get(part))
            .cloned()
    }

    /// The helpers directory, falling back to the conventional default.
    pub fn helpers_path(&self) -> PathBuf {
        self.get(HELPERS_PATH_KEY)
            .and_then(|value| value.as_str().map(PathBuf::from))
            .unwrap_or_else(default_helpers_path)
    }
}
