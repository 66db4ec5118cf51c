use sqlx::SqlitePool;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}
