use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::Deserialize;

const TOOLS_PLACEHOLDER: &str = "{{TOOLS_INSTRUCTION}}";
const TOOLS_INSTRUCTION: &str = "You have access to Git tools to analyze the repository.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RepochatConfig {
    pub chat: ChatConfig,
    pub tools: ToolsConfig,
    pub models: ModelsConfig,
}

impl RepochatConfig {
    /// Load `~/.repochat/config.toml`; a missing file means defaults.
    pub fn load() -> Result<Self, String> {
        let path = repochat_config_path()?;
        Self::load_from_path(&path)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| format!("read config.toml: {e}"))?;
        toml::from_str(&raw).map_err(|e| format!("parse config.toml: {e}"))
    }

    pub fn config_path() -> Result<PathBuf, String> {
        repochat_config_path()
    }

    /// `ALLOW_MCP_TOOLS=true` turns tools on regardless of the file.
    pub fn tools_enabled(&self) -> bool {
        if matches!(std::env::var("ALLOW_MCP_TOOLS").as_deref(), Ok("true")) {
            return true;
        }
        self.tools.enabled
    }

    /// System prompt with the tools sentence filled in or blanked.
    pub fn system_prompt(&self, tools_enabled: bool) -> String {
        let instruction = if tools_enabled { TOOLS_INSTRUCTION } else { "" };
        self.chat
            .system_prompt
            .replace(TOOLS_PLACEHOLDER, instruction)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// May contain `{{TOOLS_INSTRUCTION}}`.
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: format!(
                "You are a helpful assistant that answers questions about the user's git repository. {TOOLS_PLACEHOLDER}"
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub enabled: bool,
    pub repo_path: Option<String>,
    pub default_commit_limit: usize,
    pub command_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            repo_path: None,
            default_commit_limit: 10,
            command_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub local_model: String,
    pub cloud_model: String,
    pub local_base_url: String,
    pub cloud_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            local_model: "llama3.2".to_string(),
            cloud_model: "gpt-4o-mini".to_string(),
            local_base_url: "http://localhost:11434/v1".to_string(),
            cloud_base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// `$REPOCHAT_HOME`, or `~/.repochat`. Created when missing.
pub fn repochat_home_dir() -> Result<PathBuf, String> {
    let dir = match std::env::var_os("REPOCHAT_HOME").filter(|v| !v.is_empty()) {
        Some(custom) => {
            let path = PathBuf::from(custom);
            if path.is_relative() {
                return Err("REPOCHAT_HOME must be an absolute path".to_string());
            }
            path
        }
        None => BaseDirs::new()
            .map(|base| base.home_dir().join(".repochat"))
            .ok_or_else(|| "failed to resolve user home; set REPOCHAT_HOME".to_string())?,
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
    Ok(dir)
}

pub fn repochat_config_path() -> Result<PathBuf, String> {
    Ok(repochat_home_dir()?.join("config.toml"))
}
