use chrono::{DateTime, Utc};
use ninewatch_core::error::ApiError;
use ninewatch_core::models::{MediaSummary, WatchHistoryEntry};
use ninewatch_db::repo::accounts::{self, AccountRow};
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::LazyLock;

use crate::auth::{Session, issue_session};
use crate::error::AppError;
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 4;
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Same message for unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]{3,32}$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Validate registration fields. Returns field-level errors or `None`.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Option<Value> {
    let mut fields = serde_json::Map::new();

    if !USERNAME_RE.is_match(username) {
        fields.insert(
            "username".to_string(),
            json!(["must match ^[a-zA-Z0-9._-]{3,32}$"]),
        );
    }

    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        fields.insert("email".to_string(), json!(["must be a valid email address"]));
    }

    if password.len() < MIN_PASSWORD_LEN || password.len() > MAX_PASSWORD_LEN {
        fields.insert(
            "password".to_string(),
            json!([format!(
                "must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters"
            )]),
        );
    }

    if fields.is_empty() {
        None
    } else {
        Some(Value::Object(fields))
    }
}

pub fn default_avatar_url(username: &str) -> String {
    format!("https://api.dicebear.com/7.x/adventurer/svg?seed={username}")
}

/// Register a new account. Username and email are trimmed first.
pub async fn register(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AccountRow, AppError> {
    let username = username.trim();
    let email = email.trim();

    if let Some(fields) = validate_registration(username, email, password) {
        return Err(ApiError::Validation(fields).into());
    }

    if accounts::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::Conflict("user already exists".into()).into());
    }
    if accounts::find_by_username(&state.db, username).await?.is_some() {
        return Err(ApiError::Conflict("username is already taken".into()).into());
    }

    // A concurrent registration can still hit the unique index; that
    // surfaces as DbError::Duplicate and maps to a conflict as well.
    let avatar = default_avatar_url(username);
    let account =
        accounts::create_account(&state.db, username, email, password, Some(&avatar)).await?;

    tracing::info!(account_id = %account.id, username = %account.username, "account registered");
    Ok(account)
}

/// Check credentials and issue a session.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<Session, AppError> {
    let Some(account) = accounts::find_by_email(&state.db, email.trim()).await? else {
        accounts::verify_unknown_account(password);
        return Err(ApiError::BadRequest(INVALID_CREDENTIALS.into()).into());
    };

    let valid = accounts::verify_password(password, &account.password_hash)
        .map_err(|e| ApiError::Internal(format!("hash error: {e}")))?;

    if !valid {
        return Err(ApiError::BadRequest(INVALID_CREDENTIALS.into()).into());
    }

    Ok(issue_session(&account.id, &state.jwt_secret, state.token_ttl)?)
}

/// Account as shown to its owner. Never includes the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub watch_history: Vec<HistoryItemView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemView {
    #[serde(flatten)]
    pub entry: WatchHistoryEntry,
    pub media: MediaSummary,
}

impl AccountView {
    pub fn new(account: AccountRow, history: Vec<(WatchHistoryEntry, MediaSummary)>) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            avatar_url: account.avatar_url,
            created_at: DateTime::from_timestamp(account.created_ts, 0).unwrap_or_default(),
            watch_history: history
                .into_iter()
                .map(|(entry, media)| HistoryItemView { entry, media })
                .collect(),
        }
    }
}
