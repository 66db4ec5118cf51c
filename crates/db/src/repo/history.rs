use chrono::{DateTime, Utc};
use ninewatch_core::models::{MediaSummary, WatchHistoryEntry};
use ninewatch_core::types::MediaKind;
use sqlx::SqlitePool;

use crate::DbError;

/// Record progress for one media item.
///
/// An existing entry keeps its place in the list and only has progress and
/// last-watched updated. A new entry goes in front of every existing one.
/// Both cases are one statement, keyed on `(account_id, media_id)`, so
/// concurrent writers for the same account cannot duplicate an entry or
/// drop an update.
pub async fn upsert_entry(
    pool: &SqlitePool,
    account_id: &str,
    media_id: &str,
    progress: f64,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO watch_history (account_id, media_id, progress, last_watched_ms, position) \
         VALUES (?, ?, ?, ?, \
           (SELECT COALESCE(MIN(position), 0) - 1 FROM watch_history WHERE account_id = ?)) \
         ON CONFLICT(account_id, media_id) DO UPDATE SET \
         progress = excluded.progress, last_watched_ms = excluded.last_watched_ms",
    )
    .bind(account_id)
    .bind(media_id)
    .bind(progress)
    .bind(now)
    .bind(account_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Full history for an account, front first.
pub async fn list_history(
    pool: &SqlitePool,
    account_id: &str,
) -> Result<Vec<WatchHistoryEntry>, sqlx::Error> {
    let rows: Vec<(String, f64, i64)> = sqlx::query_as(
        "SELECT media_id, progress, last_watched_ms FROM watch_history \
         WHERE account_id = ? ORDER BY position",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(media_id, progress, ms)| WatchHistoryEntry {
            media_id,
            progress,
            last_watched: from_millis(ms),
        })
        .collect())
}

/// History joined with a short summary of each media item, front first.
pub async fn list_history_with_media(
    pool: &SqlitePool,
    account_id: &str,
) -> Result<Vec<(WatchHistoryEntry, MediaSummary)>, DbError> {
    let rows: Vec<(String, f64, i64, String, String, String)> = sqlx::query_as(
        "SELECT h.media_id, h.progress, h.last_watched_ms, m.title, m.poster_url, m.kind \
         FROM watch_history h JOIN media m ON m.id = h.media_id \
         WHERE h.account_id = ? ORDER BY h.position",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(media_id, progress, ms, title, poster_url, kind)| {
            let kind = MediaKind::parse(&kind).ok_or(DbError::UnknownKind(kind))?;
            let summary = MediaSummary {
                id: media_id.clone(),
                title,
                poster_url,
                kind,
            };
            let entry = WatchHistoryEntry {
                media_id,
                progress,
                last_watched: from_millis(ms),
            };
            Ok((entry, summary))
        })
        .collect()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
