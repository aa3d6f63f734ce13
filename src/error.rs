//! Error types for the proxy cache
//!
//! All modules use `ProxyResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for proxy cache operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// All errors that can occur while resolving, building or loading proxies
#[derive(Error, Debug)]
pub enum ProxyError {
    // Resolution errors
    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Invalid proxy request for {base_type}: {reason}")]
    InvalidProxy { base_type: String, reason: String },

    // Build errors
    #[error("Proxy generation failed for {identity}: {reason}")]
    Generation { identity: String, reason: String },

    #[error("Failed to package {path}: {source}")]
    Packaging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No proxy generator configured")]
    GeneratorNotConfigured,

    // Thumbprint errors
    #[error("Cannot compute proxy thumbprint: {0}")]
    Thumbprint(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ProxyError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a generation error for an identity
    pub fn generation(identity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Generation {
            identity: identity.into(),
            reason: reason.into(),
        }
    }

    /// Create a packaging error for a path
    pub fn packaging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Packaging {
            path: path.into(),
            source,
        }
    }

    /// Check if error is retryable
    ///
    /// Failed builds are never cached, so a later request for the same
    /// identity runs the pipeline again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation { .. } | Self::Packaging { .. } | Self::CommandFailed { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Thumbprint(_) => Some("Set package.manifest in config or pass --manifest"),
            Self::GeneratorNotConfigured => Some("Set generator.command in config"),
            Self::InvalidProxy { .. } => Some("Request the proxy against the original base type"),
            Self::ConfigInvalid { .. } => Some("Run: proxy-cache config init --force"),
            _ => None,
        }
    }
}
