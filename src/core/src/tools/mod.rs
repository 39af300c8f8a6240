use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Duration;

use crate::RepochatConfig;

mod args;
mod git;
mod git_tools;
mod registry;

pub use git::{is_traversal, parse_log, parse_status, CommitSummary, GitRepo, WorkingTreeStatus};
pub use registry::ToolRegistry;

/// Errors that keep a tool from running at all.
///
/// Failures while running (git errors, denied paths) are not errors: they
/// come back as an `{"error": ...}` result value the model can read.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    #[error("tools are disabled")]
    Disabled,

    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// A tool the model (or an HTTP client) can invoke by name.
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;
    fn call(&self, args: Value) -> BoxFuture<'static, Result<Value, ToolError>>;
}

#[derive(Debug, Clone)]
pub struct ToolContext {
    pub repo: Arc<GitRepo>,
    pub default_commit_limit: usize,
}

impl ToolContext {
    pub fn new(repo: GitRepo, default_commit_limit: usize) -> Self {
        Self {
            repo: Arc::new(repo),
            default_commit_limit,
        }
    }

    /// Resolve the repository from `REPO_PATH`, then `tools.repo_path`.
    pub fn from_config(config: &RepochatConfig) -> Self {
        let configured = std::env::var_os("REPO_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| config.tools.repo_path.as_ref().map(PathBuf::from));
        let timeout = Duration::from_secs(config.tools.command_timeout_secs);
        let repo = GitRepo::discover(configured.as_deref(), timeout);
        tracing::info!(repo = %repo.path().display(), "git tools bound to repository");
        Self::new(repo, config.tools.default_commit_limit)
    }
}

/// Structured failure value returned to the caller instead of an error.
pub(crate) fn error_result(message: impl Into<String>) -> Value {
    serde_json::json!({ "error": message.into() })
}
