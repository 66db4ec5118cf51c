use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ninewatch_core::error::ApiError;
use ninewatch_core::models::{Collection, MediaItem, WatchHistoryEntry};
use ninewatch_core::query::{BrowseFilter, BrowseParams};
use ninewatch_db::repo::{accounts, history, media};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::accounts::AccountView;
use crate::auth::{AuthAccount, Session};
use crate::catalog::{self, BrowsePage};
use crate::error::{ApiJson, AppError};
use crate::rate_limit::{RateLimiter, rate_limit_middleware};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_router())
        // Catalog
        .route("/media/browse", get(browse_media))
        .route("/media/homepage", get(homepage))
        .route("/media/{id}", get(get_media))
        // Accounts
        .route("/users/profile", get(profile))
        .route("/users/history", post(update_history))
}

fn auth_router() -> Router<AppState> {
    let rate_limiter = RateLimiter::new(30, Duration::from_secs(60));
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(Extension(rate_limiter))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Browse never rejects its query string: repeated keys keep their first
/// value and an unparseable string means no filter at all.
async fn browse_media(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<BrowsePage>, AppError> {
    let params = match query {
        Ok(Query(pairs)) => BrowseParams::from_pairs(pairs),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring unparseable browse query");
            BrowseParams::default()
        }
    };
    let filter = BrowseFilter::from_params(&params);
    Ok(Json(catalog::browse(&state.db, &filter).await?))
}

async fn homepage(State(state): State<AppState>) -> Result<Json<Vec<Collection>>, AppError> {
    Ok(Json(catalog::homepage_collections(&state.db).await?))
}

async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MediaItem>, AppError> {
    let item = media::get_media(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound("media not found".into()))?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountView>), AppError> {
    let account =
        crate::accounts::register(&state, &body.username, &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(AccountView::new(account, Vec::new()))))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<Session>, AppError> {
    let session = crate::accounts::login(&state, &body.email, &body.password).await?;
    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

async fn profile(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> Result<Json<AccountView>, AppError> {
    let account = accounts::find_by_id(&state.db, &auth.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let entries = history::list_history_with_media(&state.db, &account.id).await?;
    Ok(Json(AccountView::new(account, entries)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRequest {
    media_id: Option<String>,
    progress: Option<f64>,
}

async fn update_history(
    State(state): State<AppState>,
    auth: AuthAccount,
    ApiJson(body): ApiJson<HistoryRequest>,
) -> Result<Json<Vec<WatchHistoryEntry>>, AppError> {
    let (Some(media_id), Some(progress)) = (body.media_id, body.progress) else {
        return Err(ApiError::BadRequest("mediaId and progress are required".into()).into());
    };

    let entries =
        crate::history::record_progress(&state.db, &auth.account_id, &media_id, progress).await?;
    Ok(Json(entries))
}
