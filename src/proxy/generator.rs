//! Proxy generator collaborator
//!
//! The bytecode emission itself lives outside this crate. `CommandGenerator`
//! drives an external generator program, passing the request through the
//! environment:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `PROXY_IDENTITY` | canonical identity, also the name to define |
//! | `PROXY_NAME` | requested proxy name |
//! | `PROXY_BASE_TYPE` | resolved base type |
//! | `PROXY_OVERRIDES` | comma separated, sorted; unset when absent |
//! | `PROXY_THUMBPRINT` | live thumbprint |
//! | `PROXY_OUTPUT` | file the artifact must be written to |
//!
//! Exit code [`BASE_TYPE_NOT_FOUND_EXIT`] reports an unknown base type.

use crate::cache::thumbprint::Thumbprint;
use crate::config::schema::GeneratorConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::proxy::identity::ProxyIdentity;
use crate::proxy::loader::TypeHandle;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit status a generator program uses for "base type not found"
pub const BASE_TYPE_NOT_FOUND_EXIT: i32 = 3;

/// Max number of stderr lines carried into a generation error
const ERROR_TAIL_LINES: usize = 20;

/// What to generate
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub identity: &'a ProxyIdentity,
    pub proxy_name: &'a str,
    pub base_type: &'a TypeHandle,
    pub overrides: Option<&'a BTreeSet<String>>,
    pub thumbprint: &'a Thumbprint,
}

/// Turns a base type and override set into a raw compiled artifact
///
/// Implementations must be deterministic for identical requests and safe to
/// call again after a failure.
#[async_trait]
pub trait ProxyGenerator: Send + Sync {
    /// Write the artifact to `output` and return the path written
    ///
    /// Fails with `TypeNotFound` for an unknown base type and `Generation`
    /// for anything else.
    async fn generate(&self, request: &GenerationRequest<'_>, output: &Path)
        -> ProxyResult<PathBuf>;
}

/// Generator backed by an external program
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from configuration, `None` when no command is configured
    pub fn from_config(config: &GeneratorConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .map(|program| Self::new(program.clone(), config.args.clone()))
    }
}

#[async_trait]
impl ProxyGenerator for CommandGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
        output: &Path,
    ) -> ProxyResult<PathBuf> {
        debug!("Executing: {} {:?} for {}", self.program, self.args, request.identity);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("PROXY_IDENTITY", request.identity.as_str())
            .env("PROXY_NAME", request.proxy_name)
            .env("PROXY_BASE_TYPE", request.base_type.name())
            .env("PROXY_THUMBPRINT", request.thumbprint.as_str())
            .env("PROXY_OUTPUT", output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match request.overrides {
            Some(overrides) => {
                let joined = overrides.iter().cloned().collect::<Vec<_>>().join(",");
                command.env("PROXY_OVERRIDES", joined);
            }
            None => {
                command.env_remove("PROXY_OVERRIDES");
            }
        }

        let output_status = command
            .output()
            .await
            .map_err(|e| ProxyError::command_failed(&self.program, e))?;

        if output_status.status.success() {
            return Ok(output.to_path_buf());
        }

        let stderr = String::from_utf8_lossy(&output_status.stderr);
        if output_status.status.code() == Some(BASE_TYPE_NOT_FOUND_EXIT) {
            return Err(ProxyError::TypeNotFound(request.base_type.name().to_string()));
        }

        Err(ProxyError::generation(
            request.identity.as_str(),
            format!(
                "{} exited with {}: {}",
                self.program,
                output_status.status,
                error_tail(&stderr)
            ),
        ))
    }
}

/// Last lines of generator diagnostics
fn error_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
