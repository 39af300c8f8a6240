use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use repochat_core::provider::ProviderEnv;
use repochat_core::tools::{ToolContext, ToolRegistry};
use repochat_core::{build_router, load_repochat_config, ServerConfig, SqliteStore};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_filter())
        .init();

    let defaults = ServerConfig::default();
    let config = ServerConfig {
        bind: parse_socket("REPOCHAT_BIND", defaults.bind),
        db_path: env::var("REPOCHAT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path),
    };

    let store = SqliteStore::open(&config.db_path)?;
    let store = Arc::new(store);

    let repochat_config = load_repochat_config();
    let tools_enabled = repochat_config.tools_enabled();
    let tools = ToolRegistry::new(ToolContext::from_config(&repochat_config), tools_enabled);
    tracing::info!(tools_enabled, db = %config.db_path.display(), "repochat starting");

    let app = build_router(store, repochat_config, tools, ProviderEnv::from_process());

    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

fn parse_socket(key: &str, default: SocketAddr) -> SocketAddr {
    match env::var(key) {
        Ok(v) => v.parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn tracing_filter() -> tracing_subscriber::EnvFilter {
    let explicit = env::var("REPOCHAT_LOG").or_else(|_| env::var("RUST_LOG")).ok();
    if let Some(filter) = explicit {
        return tracing_subscriber::EnvFilter::new(filter);
    }
    if matches!(
        env::var("REPOCHAT_DEBUG").as_deref(),
        Ok("1" | "true" | "TRUE" | "yes" | "YES")
    ) {
        return tracing_subscriber::EnvFilter::new("debug");
    }
    tracing_subscriber::EnvFilter::new("info")
}
