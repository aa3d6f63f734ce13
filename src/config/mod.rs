//! Configuration management for the proxy cache

pub mod schema;

pub use schema::Config;

use crate::cache::layout::write_atomic;
use crate::error::{ProxyError, ProxyResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proxy-cache")
            .join("config.toml")
    }

    /// Get the default cache root used when `cache.root` is unset
    pub fn default_cache_root() -> PathBuf {
        dirs::cache_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proxy-cache")
    }

    /// Resolve the cache root for a configuration
    pub fn cache_root(config: &Config) -> PathBuf {
        config
            .cache
            .root
            .clone()
            .unwrap_or_else(Self::default_cache_root)
    }

    /// Load configuration; a missing file yields the defaults
    pub async fn load(&self) -> ProxyResult<Config> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => parse_config(&self.config_path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    "No config at {}, using defaults",
                    self.config_path.display()
                );
                Ok(Config::default())
            }
            Err(e) => Err(ProxyError::io(
                format!("reading config {}", self.config_path.display()),
                e,
            )),
        }
    }

    /// Load a config file that must exist
    pub async fn load_from_file(&self, path: &Path) -> ProxyResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ProxyError::io(format!("reading config {}", path.display()), e))?;
        parse_config(path, &content)
    }

    /// Write the whole config, replacing the file in one rename
    pub async fn save(&self, config: &Config) -> ProxyResult<()> {
        if let Some(dir) = self.config_path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| ProxyError::ConfigDirCreate {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let rendered = toml::to_string_pretty(config)?;
        write_atomic(&self.config_path, rendered.as_bytes())
            .await
            .map_err(|e| {
                ProxyError::io(format!("writing config {}", self.config_path.display()), e)
            })?;

        info!("Saved proxy cache config to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

fn parse_config(path: &Path, content: &str) -> ProxyResult<Config> {
    toml::from_str(content).map_err(|e| ProxyError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
