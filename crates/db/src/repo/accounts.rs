use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sqlx::SqlitePool;
use std::sync::LazyLock;

/// Hash of a password nobody holds. Checked when the account is unknown so
/// both login failure paths do the same argon2 work.
static UNKNOWN_ACCOUNT_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("ninewatch-unknown-account").ok());

/// Account row from the database.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub created_ts: i64,
}

type AccountTuple = (String, String, String, String, Option<String>, i64);

/// Create a new account. Fails with [`crate::DbError::Duplicate`] when the
/// username or email is already taken.
pub async fn create_account(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password: &str,
    avatar_url: Option<&str>,
) -> Result<AccountRow, crate::DbError> {
    let id = uuid::Uuid::new_v4().to_string();
    let hash = hash_password(password)?;
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query(
        "INSERT INTO account (id, username, email, password_hash, avatar_url, created_ts) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(username)
    .bind(email)
    .bind(&hash)
    .bind(avatar_url)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            let field = if db_err.message().contains("account.email") {
                "email"
            } else {
                "username"
            };
            return Err(crate::DbError::Duplicate(field));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(AccountRow {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: hash,
        avatar_url: avatar_url.map(str::to_string),
        created_ts: now,
    })
}

/// Find account by email.
pub async fn find_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<AccountRow>, sqlx::Error> {
    let row: Option<AccountTuple> = sqlx::query_as(
        "SELECT id, username, email, password_hash, avatar_url, created_ts \
         FROM account WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_account))
}

/// Find account by username.
pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<AccountRow>, sqlx::Error> {
    let row: Option<AccountTuple> = sqlx::query_as(
        "SELECT id, username, email, password_hash, avatar_url, created_ts \
         FROM account WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_account))
}

/// Find account by ID.
pub async fn find_by_id(
    pool: &SqlitePool,
    account_id: &str,
) -> Result<Option<AccountRow>, sqlx::Error> {
    let row: Option<AccountTuple> = sqlx::query_as(
        "SELECT id, username, email, password_hash, avatar_url, created_ts \
         FROM account WHERE id = ?",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_account))
}

pub async fn account_exists(pool: &SqlitePool, account_id: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM account WHERE id = ?")
        .bind(account_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, crate::DbError> {
    let parsed = PasswordHash::new(hash).map_err(|e| crate::DbError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Run a full verification for a login whose account does not exist.
/// Always returns `false`.
pub fn verify_unknown_account(password: &str) -> bool {
    if let Some(hash) = UNKNOWN_ACCOUNT_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
    false
}

fn hash_password(password: &str) -> Result<String, crate::DbError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| crate::DbError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

fn row_to_account(r: AccountTuple) -> AccountRow {
    AccountRow {
        id: r.0,
        username: r.1,
        email: r.2,
        password_hash: r.3,
        avatar_url: r.4,
        created_ts: r.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;

    async fn test_pool() -> SqlitePool {
        let pool = crate::connect(":memory:").await.unwrap();
        crate::migrate::run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let pool = test_pool().await;
        let account = create_account(&pool, "alice", "a@x.com", "pw123", None)
            .await
            .unwrap();

        assert_ne!(account.password_hash, "pw123");
        assert!(account.password_hash.starts_with("$argon2"));
        assert!(verify_password("pw123", &account.password_hash).unwrap());
        assert!(!verify_password("pw124", &account.password_hash).unwrap());

        let found = find_by_email(&pool, "a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert!(account_exists(&pool, &account.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_and_username_are_reported() {
        let pool = test_pool().await;
        create_account(&pool, "alice", "a@x.com", "pw123", None)
            .await
            .unwrap();

        let err = create_account(&pool, "alice2", "a@x.com", "pw123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate("email")));

        let err = create_account(&pool, "alice", "b@x.com", "pw123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate("username")));
    }

    #[test]
    fn unknown_account_never_verifies() {
        assert!(UNKNOWN_ACCOUNT_HASH.as_deref().unwrap().starts_with("$argon2"));
        assert!(!verify_unknown_account("pw123"));
        assert!(!verify_unknown_account("ninewatch-unknown-account"));
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() {
        let pool = test_pool().await;
        assert!(find_by_email(&pool, "nobody@x.com").await.unwrap().is_none());
        assert!(find_by_username(&pool, "nobody").await.unwrap().is_none());
        assert!(find_by_id(&pool, "nope").await.unwrap().is_none());
        assert!(!account_exists(&pool, "nope").await.unwrap());
    }
}
