//! Configuration schema for the proxy cache
//!
//! Configuration is stored at `~/.config/proxy-cache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// On-disk cache layout
    pub cache: CacheConfig,

    /// Proxy naming rules
    pub proxy: ProxyConfig,

    /// External generator invocation
    pub generator: GeneratorConfig,

    /// Host package metadata
    pub package: PackageConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Cache directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root (defaults to the user cache directory)
    pub root: Option<PathBuf>,

    /// Directory under the root holding artifacts, containers and the marker
    pub secondary_dir: String,

    /// Loader workspace directory, nested under `secondary_dir`
    pub optimized_dir: String,

    /// Name of the persisted thumbprint marker file
    pub thumb_file: String,

    /// Extension of raw generated artifacts
    pub artifact_ext: String,

    /// Extension of loadable containers
    pub container_ext: String,

    /// Extension of files staged in the loader workspace
    pub optimized_ext: String,

    /// Name of the single entry inside each container
    pub container_entry: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            secondary_dir: "secondary".to_string(),
            optimized_dir: "optimized".to_string(),
            thumb_file: "proxyThumb".to_string(),
            artifact_ext: "dex".to_string(),
            container_ext: "jar".to_string(),
            optimized_ext: "odex".to_string(),
            container_entry: "classes.dex".to_string(),
        }
    }
}

/// Proxy naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Namespace every generated proxy lives in
    pub namespace_prefix: String,

    /// Base type that is already extended and never proxied
    pub reserved_base_type: Option<String>,

    /// Character in type names that is unsafe inside file names
    pub unsafe_separator: char,

    /// Replacement for `unsafe_separator`
    pub safe_separator: char,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "com.tns.gen.".to_string(),
            reserved_base_type: Some("com.tns.NativeScriptActivity".to_string()),
            unsafe_separator: '$',
            safe_separator: '_',
        }
    }
}

/// External generator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generator program (resolved through PATH)
    pub command: Option<String>,

    /// Extra arguments passed before the request environment
    pub args: Vec<String>,
}

/// Host package metadata settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    /// JSON package record carrying `version_code`
    pub manifest: Option<PathBuf>,
}
