use serde::Serialize;
use thiserror::Error;

/// Unified API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    /// Field-level input errors, e.g. `{ "email": ["must look like name@domain"] }`.
    #[error("validation failed")]
    Validation(serde_json::Value),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate registration. Reported as 400 like any other rejected input.
    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation_failed",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::Conflict(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to a caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::Validation(fields) => fields.clone(),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// JSON error envelope: `{ "error": { "code": "…", "message": "…", "details": {} } }`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(e: &ApiError) -> Self {
        Self {
            error: ErrorBody {
                code: e.code().to_string(),
                message: e.public_message(),
                details: e.details(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_bad_request_status() {
        let err = ApiError::Conflict("user already exists".into());
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::Internal("db error: disk I/O error".into());
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.error.code, "internal_error");
        assert_eq!(envelope.error.message, "internal server error");
    }

    #[test]
    fn validation_fields_travel_in_details() {
        let err = ApiError::Validation(serde_json::json!({ "email": ["is required"] }));
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(err.status_code(), 400);
        assert_eq!(envelope.error.code, "validation_failed");
        assert_eq!(envelope.error.details["email"][0], "is required");
    }
}
