use std::path::PathBuf;

pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Startup configuration, read once from `NINEWATCH_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub bind_addr: String,
    /// `None` means a random secret is generated and tokens die with the process.
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
    /// JSON catalog imported at startup when the catalog is empty.
    pub catalog_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token_ttl_days = non_empty("NINEWATCH_TOKEN_TTL_DAYS")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_DAYS);

        let log_format = match non_empty("NINEWATCH_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            db_path: non_empty("NINEWATCH_DB").unwrap_or_else(|| "ninewatch.db".to_string()),
            bind_addr: non_empty("NINEWATCH_BIND").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            jwt_secret: non_empty("NINEWATCH_JWT_SECRET"),
            token_ttl_days,
            catalog_file: non_empty("NINEWATCH_CATALOG_FILE").map(PathBuf::from),
            log_format,
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_ttl_days)
    }
}
