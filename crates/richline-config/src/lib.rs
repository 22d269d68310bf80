use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    Read {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    Parse {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown list tag {tag:?} in config file (expected \"ul\" or \"ol\")")]
    UnknownListTag { tag: String },
}

fn default_list_tag() -> String {
    "ul".to_string()
}

/// Startup configuration for the richline front end: which document to open
/// and which list tag a fresh block starts with.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub document_path: PathBuf,
    #[serde(default = "default_list_tag")]
    pub default_list_tag: String,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if !matches!(config.default_list_tag.as_str(), "ul" | "ol") {
            return Err(ConfigError::UnknownListTag {
                tag: config.default_list_tag,
            });
        }

        // Expand shell variables and tilde in the loaded document path
        config.document_path = expand_path(&config.document_path).unwrap_or(config.document_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/richline");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}

fn expand_path(path: &Path) -> Option<PathBuf> {
    let path_str = path.to_string_lossy();
    match shellexpand::full(&path_str) {
        Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
        Err(_) => None,
    }
}
