use std::sync::Arc;

use repochat_protocol::ToolDescriptor;
use serde_json::Value;

use super::git_tools::{FileContentTool, RecentCommitsTool, StatusTool};
use super::{Tool, ToolContext, ToolError};

/// Name-addressable set of tools, gated by a single enable switch.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    enabled: bool,
}

impl ToolRegistry {
    /// Registry holding the git inspection tools.
    pub fn new(ctx: ToolContext, enabled: bool) -> Self {
        let mut registry = Self::empty(enabled);
        let git_tools: [Arc<dyn Tool>; 3] = [
            Arc::new(RecentCommitsTool::new(ctx.clone())),
            Arc::new(StatusTool::new(ctx.clone())),
            Arc::new(FileContentTool::new(ctx)),
        ];
        for tool in git_tools {
            if let Err(err) = registry.register(tool) {
                tracing::warn!(error = %err, "skipping tool");
            }
        }
        registry
    }

    pub fn empty(enabled: bool) -> Self {
        Self {
            tools: Vec::new(),
            enabled,
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), String> {
        if self.get(tool.name()).is_some() {
            return Err(format!("tool name conflict `{}`", tool.name()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.name() == name).cloned()
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        if !self.enabled {
            return Err(ToolError::Disabled);
        }
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tracing::info!(tool = name, "tool invoked");
        tool.call(args).await
    }
}
