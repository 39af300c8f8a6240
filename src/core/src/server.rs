use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use repochat_protocol::{
    ChatRequest, ErrorBody, ModelCommandResponse, ModelInfo, NormalizeRequest, NormalizeResponse,
    SettingsUpdate, ToolDescriptor,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::chat::{normalize, render_conversation};
use crate::provider::{self, ProviderEnv, ProviderError};
use crate::settings::{update_settings, SettingsError};
use crate::storage::SettingsStore;
use crate::tools::{ToolError, ToolRegistry};
use crate::RepochatConfig;

/// Shared state accessible by handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub store: Arc<dyn SettingsStore>,
    pub tools: Arc<ToolRegistry>,
    pub repochat_config: Arc<RepochatConfig>,
    pub provider_env: Arc<ProviderEnv>,
    pub http: reqwest::Client,
}

/// Build the axum router for the dashboard API.
///
/// `provider_env` is normally [`ProviderEnv::from_process`]; tests pass an
/// explicit value so the host environment cannot leak in.
pub fn build_router(
    store: Arc<dyn SettingsStore>,
    repochat_config: RepochatConfig,
    tools: ToolRegistry,
    provider_env: ProviderEnv,
) -> Router {
    let timeout = Duration::from_secs(repochat_config.models.request_timeout_secs);
    let http = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(err) => {
            tracing::warn!(error = %err, "failed to build http client; using defaults");
            reqwest::Client::new()
        }
    };

    let state = AppState {
        store,
        tools: Arc::new(tools),
        repochat_config: Arc::new(repochat_config),
        provider_env: Arc::new(provider_env),
        http,
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/health/llm", get(llm_health))
        .route("/api/model", get(model_info))
        .route("/api/settings", get(list_settings).post(save_settings))
        .route("/api/settings/{key}", get(get_setting).delete(delete_setting))
        .route("/api/messages/normalize", post(normalize_messages))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/{name}", post(invoke_tool))
        .route("/api/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `~/.repochat/config.toml`, or defaults when it cannot be read.
pub fn load_repochat_config() -> RepochatConfig {
    match RepochatConfig::load() {
        Ok(config) => config,
        Err(err) => {
            let path = RepochatConfig::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "~/.repochat/config.toml".to_string());
            tracing::warn!(%path, error = %err, "failed to load repochat config; using defaults");
            RepochatConfig::default()
        }
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.message))).into_response()
    }
}

impl From<SettingsError> for ApiError {
    fn from(err: SettingsError) -> Self {
        let status = match err {
            SettingsError::UnknownProvider(_) | SettingsError::InvalidBaseUrl { .. } => {
                StatusCode::BAD_REQUEST
            }
            SettingsError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ToolError> for ApiError {
    fn from(err: ToolError) -> Self {
        let status = match err {
            ToolError::Disabled => StatusCode::FORBIDDEN,
            ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ToolError::InvalidArguments { .. } => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        tracing::warn!(error = %err, "chat backend request failed");
        Self::new(StatusCode::BAD_GATEWAY, err.to_string())
    }
}

impl AppState {
    fn settings(&self) -> Result<BTreeMap<String, String>, ApiError> {
        self.store.list_settings().map_err(ApiError::internal)
    }

    fn current_model(&self) -> Result<provider::ModelSelection, ApiError> {
        let settings = self.settings()?;
        Ok(provider::select_model(
            &settings,
            &self.provider_env,
            &self.repochat_config.models,
        ))
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn llm_health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let selection = state.current_model()?;
    let report = provider::check_health(&state.http, &selection).await;
    let status = if report.status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((status, Json(report)).into_response())
}

async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>, ApiError> {
    Ok(Json(state.current_model()?.info()))
}

async fn list_settings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    Ok(Json(state.settings()?))
}

async fn save_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    update_settings(state.store.as_ref(), &update)?;
    Ok(Json(state.settings()?))
}

async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let value = state
        .store
        .get_setting(&key)
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown setting `{key}`")))?;
    Ok(Json(serde_json::json!({ "key": key, "value": value })))
}

/// Removing a stored key lets the env and config defaults apply again.
async fn delete_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_setting(&key)
        .map_err(ApiError::internal)?;
    tracing::info!(%key, "setting cleared");
    Ok(StatusCode::NO_CONTENT)
}

async fn normalize_messages(Json(request): Json<NormalizeRequest>) -> Json<NormalizeResponse> {
    let messages = normalize(&request.messages);
    let rendered = render_conversation(&messages, request.is_loading);
    Json(NormalizeResponse { messages, rendered })
}

async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.tools.list())
}

async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let args = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("invalid json body: {e}"))
        })?
    };
    Ok(Json(state.tools.invoke(&name, args).await?))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if provider::is_model_command(&request.messages) {
        let model = state.current_model()?.info();
        return Ok(Json(ModelCommandResponse {
            status: "ok".to_string(),
            model,
        })
        .into_response());
    }

    let settings = state.settings()?;
    let selection = provider::resolve_model(
        &settings,
        &state.provider_env,
        &state.repochat_config.models,
    )?;
    let system = state.repochat_config.system_prompt(state.tools.enabled());
    let reply = provider::complete(
        &state.http,
        &selection,
        &system,
        &request.messages,
        &state.tools,
    )
    .await?;
    Ok(Json(reply).into_response())
}
