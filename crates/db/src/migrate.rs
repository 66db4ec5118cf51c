use sqlx::SqlitePool;
use tracing::{debug, info};

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_initial_schema",
    sql: include_str!("../migrations/001_initial_schema.sql"),
}];

/// Apply pending forward-only migrations, each in its own transaction.
/// Applied names are recorded in `_migrations`.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_ts INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let applied: Option<(String,)> =
            sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                .bind(migration.name)
                .fetch_optional(pool)
                .await?;

        if applied.is_some() {
            debug!(migration = migration.name, "already applied");
            continue;
        }

        let mut tx = pool.begin().await?;
        // Split on ';' so migration files cannot contain semicolons in literals.
        for statement in migration.sql.split(';').map(str::trim) {
            if !statement.is_empty() {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
        }
        sqlx::query("INSERT INTO _migrations (name, applied_ts) VALUES (?, ?)")
            .bind(migration.name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(migration = migration.name, "migration applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn running_twice_is_a_no_op() {
        let pool = crate::connect(":memory:").await.unwrap();
        run(&pool).await.unwrap();
        run(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn creates_catalog_and_account_tables() {
        let pool = crate::connect(":memory:").await.unwrap();
        run(&pool).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name IN ('media', 'account', 'watch_history') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["account", "media", "watch_history"]);
    }
}
