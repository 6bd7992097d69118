use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use repsync_core::services::SyncService;
use repsync_core::{PullRequest, PullResponse, PushRequest, PushResponse, StatusResponse};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthenticatedUser;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::rate_limit::{EndpointRateLimiter, ProtectedEndpoint, RateLimitMetricsSnapshot};

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    service: SyncService,
    endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    pub async fn from_config(config: Arc<AppConfig>) -> Result<Self, repsync_core::Error> {
        let service =
            SyncService::open_path(&config.database_path, config.service_options()).await?;
        Ok(Self::new(config, service))
    }

    pub fn new(config: Arc<AppConfig>, service: SyncService) -> Self {
        Self {
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            service,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/sync/push", post(push))
        .route("/sync/pull", post(pull))
        .route("/sync/status", get(status))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.service.ping().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    }))
}

async fn require_auth(mut request: Request, next: Next) -> Result<Response, AppError> {
    let user = AuthenticatedUser::from_headers(request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn push(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<PushRequest>,
) -> Result<Json<PushResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Push, &user.user_id)
        .await?;

    let user_hash = user.fingerprint();
    let record_count = request.batch.len();

    // Detached so a dropped client connection cannot abandon an open transaction.
    let service = state.service.clone();
    let user_id = user.user_id;
    let response = tokio::spawn(async move { service.push(&user_id, &request).await })
        .await
        .map_err(|error| AppError::internal(format!("push task failed: {error}")))?
        .inspect_err(|error| {
            tracing::warn!(
                endpoint = "sync_push",
                user = user_hash,
                record_count,
                "Rejected push: {error}"
            );
        })?;

    tracing::info!(
        endpoint = "sync_push",
        user = user_hash,
        record_count,
        sync_time = response.sync_time,
        "Accepted push"
    );
    Ok(Json(response))
}

async fn pull(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<PullRequest>,
) -> Result<Json<PullResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Pull, &user.user_id)
        .await?;

    let response = state.service.pull(&user.user_id, &request).await?;
    tracing::info!(
        endpoint = "sync_pull",
        user = user.fingerprint(),
        last_sync = request.last_sync,
        record_count = response.batch.len(),
        "Served pull"
    );
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    device_id: String,
}

async fn status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let response = state
        .service
        .status(&user.user_id, &query.device_id, user.subscription)
        .await?;
    Ok(Json(response))
}
