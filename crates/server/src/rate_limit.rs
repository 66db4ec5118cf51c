use axum::Json;
use axum::extract::{ConnectInfo, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ninewatch_core::error::{ErrorBody, ErrorEnvelope};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window request counter keyed by client.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<Buckets>>,
    max_requests: u64,
    window: Duration,
}

struct Buckets {
    by_client: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Buckets {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            })),
            max_requests,
            window,
        }
    }

    /// `Ok(remaining)` when the request is admitted, `Err(retry_after_secs)`
    /// when the window is full.
    pub async fn check(&self, key: &str) -> Result<u64, u64> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        // Once per window, forget clients with no requests left in it.
        if now.duration_since(inner.last_sweep) >= self.window {
            let window = self.window;
            inner.by_client.retain(|_, entries| {
                entries.retain(|t| now.duration_since(*t) < window);
                !entries.is_empty()
            });
            inner.last_sweep = now;
        }

        let entries = inner.by_client.entry(key.to_string()).or_default();
        entries.retain(|t| now.duration_since(*t) < self.window);

        if entries.len() as u64 >= self.max_requests {
            let oldest = entries.first().copied().unwrap_or(now);
            let retry = self.window.saturating_sub(now.duration_since(oldest));
            Err(retry.as_secs().max(1))
        } else {
            entries.push(now);
            Ok(self.max_requests - entries.len() as u64)
        }
    }
}

/// Limits write requests per client IP. Expects a [`RateLimiter`] extension.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::GET {
        return next.run(request).await;
    }

    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return next.run(request).await;
    };

    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| format!("ip:{}", ci.0.ip()))
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key).await {
        Ok(_remaining) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, retry_after, "rate limit exceeded");
            let envelope = ErrorEnvelope {
                error: ErrorBody {
                    code: "too_many_requests".to_string(),
                    message: "too many requests".to_string(),
                    details: serde_json::json!({ "retry_after_seconds": retry_after }),
                },
            };
            (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response()
        }
    }
}
