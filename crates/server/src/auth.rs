use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ninewatch_core::error::ApiError;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Header the web client sends its token in.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// JWT claims payload. Carries nothing but the account id.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // account ID
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(
        account_id: &str,
        issued_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<Self, ApiError> {
        let exp = issued_at
            .checked_add_signed(ttl)
            .ok_or_else(|| ApiError::Internal("time overflow".into()))?;
        Ok(Self {
            sub: account_id.to_string(),
            iat: issued_at.timestamp() as usize,
            exp: exp.timestamp() as usize,
        })
    }
}

/// Sign claims into a compact HS256 token.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {e}")))
}

/// Check signature and expiry and return the claims.
pub fn verify(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("token is not valid".into()))?;

    Ok(data.claims)
}

/// What a successful login hands back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_session(
    account_id: &str,
    secret: &str,
    ttl: chrono::Duration,
) -> Result<Session, ApiError> {
    let claims = Claims::new(account_id, Utc::now(), ttl)?;
    let token = sign(&claims, secret)?;
    let expires_at = DateTime::from_timestamp(claims.exp as i64, 0)
        .ok_or_else(|| ApiError::Internal("time overflow".into()))?;
    Ok(Session {
        token,
        account_id: account_id.to_string(),
        expires_at,
    })
}

/// Authenticated account extractor. Reads `x-auth-token`, falling back to
/// `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    pub account_id: String,
}

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized("no token, authorization denied".into()))?;

        let claims = verify(token, &state.jwt_secret)?;

        Ok(AuthAccount {
            account_id: claims.sub,
        })
    }
}

fn token_from_parts(parts: &Parts) -> Option<&str> {
    if let Some(token) = parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
