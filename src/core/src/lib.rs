pub mod chat;
mod config;
pub mod provider;
mod repochat_config;
mod server;
pub mod settings;
pub mod storage;
pub mod tools;

pub use config::ServerConfig;
pub use repochat_config::{
    repochat_config_path, repochat_home_dir, ChatConfig, ModelsConfig, RepochatConfig, ToolsConfig,
};
pub use server::{build_router, load_repochat_config};
pub use storage::{SettingsStore, SqliteStore};
