use futures::future::{BoxFuture, FutureExt};
use serde::Deserialize;
use serde_json::{json, Value};

use super::args::parse_args;
use super::git::is_traversal;
use super::{error_result, Tool, ToolContext, ToolError};

const MAX_COMMIT_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct RecentCommitsArgs {
    #[serde(default)]
    limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FileContentArgs {
    path: String,
}

pub(super) struct RecentCommitsTool {
    ctx: ToolContext,
}

impl RecentCommitsTool {
    pub(super) fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

impl Tool for RecentCommitsTool {
    fn name(&self) -> &'static str {
        "get_recent_commits"
    }

    fn description(&self) -> &'static str {
        "Get recent git commits from the current repository"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "number",
                    "description": "Number of commits to fetch",
                    "default": self.ctx.default_commit_limit,
                }
            }
        })
    }

    fn call(&self, args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        let parsed = parse_args::<RecentCommitsArgs>(self.name(), args);
        let ctx = self.ctx.clone();
        async move {
            let parsed = parsed?;
            let limit = parsed
                .limit
                .filter(|limit| limit.is_finite())
                .map(|limit| limit.max(0.0) as usize)
                .unwrap_or(ctx.default_commit_limit)
                .clamp(1, MAX_COMMIT_LIMIT);
            let value = match ctx.repo.recent_commits(limit).await {
                Ok(commits) => serde_json::to_value(&commits)
                    .unwrap_or_else(|e| error_result(format!("Error getting commits: {e}"))),
                Err(err) => error_result(format!("Error getting commits: {err}")),
            };
            Ok(value)
        }
        .boxed()
    }
}

pub(super) struct StatusTool {
    ctx: ToolContext,
}

impl StatusTool {
    pub(super) fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

impl Tool for StatusTool {
    fn name(&self) -> &'static str {
        "get_status"
    }

    fn description(&self) -> &'static str {
        "Get the current git status (branch, modified files)"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn call(&self, _args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        let ctx = self.ctx.clone();
        async move {
            let value = match ctx.repo.status().await {
                Ok(status) => serde_json::to_value(&status)
                    .unwrap_or_else(|e| error_result(format!("Error getting status: {e}"))),
                Err(err) => error_result(format!("Error getting status: {err}")),
            };
            Ok(value)
        }
        .boxed()
    }
}

pub(super) struct FileContentTool {
    ctx: ToolContext,
}

impl FileContentTool {
    pub(super) fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

impl Tool for FileContentTool {
    fn name(&self) -> &'static str {
        "get_file_content"
    }

    fn description(&self) -> &'static str {
        "Read the content of a file from the repository"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file relative to repo root",
                }
            },
            "required": ["path"]
        })
    }

    fn call(&self, args: Value) -> BoxFuture<'static, Result<Value, ToolError>> {
        let parsed = parse_args::<FileContentArgs>(self.name(), args);
        let ctx = self.ctx.clone();
        async move {
            let parsed = parsed?;
            if is_traversal(&parsed.path) {
                tracing::warn!(path = %parsed.path, "rejected file read outside repository");
                return Ok(error_result("Access denied"));
            }
            let value = match ctx.repo.file_at_head(&parsed.path).await {
                Ok(content) => Value::String(content),
                Err(err) => error_result(format!("Error reading file: {err}")),
            };
            Ok(value)
        }
        .boxed()
    }
}
