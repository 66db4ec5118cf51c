use ninewatch_core::error::ApiError;
use ninewatch_core::models::WatchHistoryEntry;
use ninewatch_db::repo::{accounts, history, media};
use serde_json::json;
use sqlx::SqlitePool;

use crate::error::AppError;

pub fn validate_progress(progress: f64) -> Result<(), ApiError> {
    if progress.is_finite() && (0.0..=1.0).contains(&progress) {
        Ok(())
    } else {
        Err(ApiError::Validation(json!({
            "progress": ["must be a number between 0 and 1"]
        })))
    }
}

/// Record a progress checkpoint and return the account's full history,
/// most recently started first.
pub async fn record_progress(
    db: &SqlitePool,
    account_id: &str,
    media_id: &str,
    progress: f64,
) -> Result<Vec<WatchHistoryEntry>, AppError> {
    validate_progress(progress)?;

    if !accounts::account_exists(db, account_id).await? {
        return Err(ApiError::NotFound("user not found".into()).into());
    }
    if !media::media_exists(db, media_id).await? {
        return Err(ApiError::NotFound("media not found".into()).into());
    }

    history::upsert_entry(db, account_id, media_id, progress).await?;
    tracing::debug!(account_id, media_id, progress, "progress recorded");

    Ok(history::list_history(db, account_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bounds() {
        assert!(validate_progress(0.0).is_ok());
        assert!(validate_progress(0.42).is_ok());
        assert!(validate_progress(1.0).is_ok());
        assert!(validate_progress(-0.01).is_err());
        assert!(validate_progress(1.5).is_err());
        assert!(validate_progress(f64::NAN).is_err());
        assert!(validate_progress(f64::INFINITY).is_err());
    }

    #[tokio::test]
    async fn unknown_account_and_media_are_not_found() {
        let pool = ninewatch_db::connect(":memory:").await.unwrap();
        ninewatch_db::migrate::run(&pool).await.unwrap();

        let err = record_progress(&pool, "nobody", "nothing", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err.0, ApiError::NotFound(ref m) if m == "user not found"));

        let account = accounts::create_account(&pool, "carol", "c@x.com", "pw123", None)
            .await
            .unwrap();
        let err = record_progress(&pool, &account.id, "nothing", 0.5)
            .await
            .unwrap_err();
        assert!(matches!(err.0, ApiError::NotFound(ref m) if m == "media not found"));

        assert!(
            history::list_history(&pool, &account.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn out_of_range_progress_is_checked_first() {
        let pool = ninewatch_db::connect(":memory:").await.unwrap();
        ninewatch_db::migrate::run(&pool).await.unwrap();

        let err = record_progress(&pool, "nobody", "nothing", 2.0)
            .await
            .unwrap_err();
        assert!(matches!(err.0, ApiError::Validation(_)));
    }
}
