//! Gateway HTTP server - Axum JSON endpoints over the fan-out orchestrator

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fanprompt_core::{
    BoardRequest, FanOutOrchestrator, ceo_and_board, list_providers, prompt_from_file,
    prompt_from_file_to_file,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::auth;
use crate::protocol::{
    ApiError, CeoAndBoardRequest, CeoAndBoardResponse, ListModelsRequest, ListModelsResponse,
    ListProvidersResponse, PromptFromFileRequest, PromptFromFileToFileRequest,
    PromptFromFileToFileResponse, PromptRequest, PromptResponse,
};

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub fan: Arc<FanOutOrchestrator>,
    pub auth_token: String,
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(fan: FanOutOrchestrator, auth_token: String) -> Self {
        Self {
            fan: Arc::new(fan),
            auth_token,
            start_time: std::time::Instant::now(),
        }
    }
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, fan: FanOutOrchestrator, auth_token: String) -> Self {
        Self {
            state: GatewayState::new(fan, auth_token),
            bind,
        }
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Serve until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("Gateway listening on {}", self.bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/prompt", post(prompt_handler))
        .route("/prompt_from_file", post(prompt_from_file_handler))
        .route("/prompt_from_file_to_file", post(prompt_from_file_to_file_handler))
        .route("/ceo_and_board", post(ceo_and_board_handler))
        .route("/list_providers", post(list_providers_handler))
        .route("/list_models", post(list_models_handler))
        .route("/api/status", get(status_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_auth(State(state): State<GatewayState>, request: Request, next: Next) -> Response {
    if !auth::is_authorized(&state.auth_token, request.headers()) {
        warn!("Unauthorized request to {}", request.uri().path());
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "detail": "Unauthorized" })),
        )
            .into_response();
    }
    next.run(request).await
}

// ── HTTP Handlers ──

async fn status_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    let router = state.fan.router();
    let providers: Vec<&str> = router
        .registry()
        .providers()
        .into_iter()
        .map(|p| p.full_name())
        .collect();

    Json(serde_json::json!({
        "status": "ok",
        "providers": providers,
        "default_models": state.fan.config().default_models,
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn prompt_handler(
    State(state): State<GatewayState>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let models = state.fan.models_or_default(req.models_prefixed_by_provider);
    debug!("POST /prompt for {} model(s)", models.len());
    let responses = state.fan.fan_out(&req.text, &models, None).await?;
    Ok(Json(PromptResponse { responses }))
}

async fn prompt_from_file_handler(
    State(state): State<GatewayState>,
    Json(req): Json<PromptFromFileRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    let responses = prompt_from_file(
        &state.fan,
        Path::new(&req.file),
        req.models_prefixed_by_provider,
        None,
    )
    .await?;
    Ok(Json(PromptResponse { responses }))
}

async fn prompt_from_file_to_file_handler(
    State(state): State<GatewayState>,
    Json(req): Json<PromptFromFileToFileRequest>,
) -> Result<Json<PromptFromFileToFileResponse>, ApiError> {
    let file_paths = prompt_from_file_to_file(
        &state.fan,
        Path::new(&req.file),
        req.models_prefixed_by_provider,
        Path::new(&req.output_dir),
        None,
    )
    .await?;
    Ok(Json(PromptFromFileToFileResponse { file_paths }))
}

async fn ceo_and_board_handler(
    State(state): State<GatewayState>,
    Json(req): Json<CeoAndBoardRequest>,
) -> Result<Json<CeoAndBoardResponse>, ApiError> {
    let decision = ceo_and_board(
        &state.fan,
        Path::new(&req.file),
        Path::new(&req.output_dir),
        BoardRequest {
            models: req.models_prefixed_by_provider,
            ceo_model: req.ceo_model,
            ..Default::default()
        },
    )
    .await?;
    Ok(Json(CeoAndBoardResponse {
        file_path: decision.display().to_string(),
    }))
}

async fn list_providers_handler() -> Json<ListProvidersResponse> {
    Json(ListProvidersResponse {
        providers: list_providers(),
    })
}

async fn list_models_handler(
    State(state): State<GatewayState>,
    Json(req): Json<ListModelsRequest>,
) -> Result<Json<ListModelsResponse>, ApiError> {
    let models = state.fan.router().route_list_models(&req.provider).await?;
    Ok(Json(ListModelsResponse { models }))
}
