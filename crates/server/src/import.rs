use anyhow::Context;
use ninewatch_core::models::NewMedia;
use ninewatch_db::repo::media;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{info, warn};

/// Load a JSON array of media records into an empty catalog.
///
/// Does nothing when the catalog already has records. Returns the number of
/// records inserted.
pub async fn import_catalog_file(db: &SqlitePool, path: &Path) -> anyhow::Result<usize> {
    let existing = media::count_media(db)
        .await
        .context("failed to count media")?;
    if existing > 0 {
        info!(existing, "catalog already populated, skipping import");
        return Ok(0);
    }

    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;
    let records: Vec<NewMedia> = serde_json::from_slice(&raw)
        .with_context(|| format!("catalog file {} is not a JSON array of media", path.display()))?;

    let mut inserted = 0;
    for record in records {
        let title = record.title.clone();
        match media::insert_media(db, record).await {
            Ok(_) => inserted += 1,
            Err(ninewatch_db::DbError::Shape(e)) => {
                warn!(title = %title, error = %e, "skipping malformed media record");
            }
            Err(e) => return Err(e).context("failed to insert media"),
        }
    }

    info!(inserted, path = %path.display(), "catalog imported");
    Ok(inserted)
}
