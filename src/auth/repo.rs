use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

use crate::auth::error::StoreError;
use crate::auth::repo_types::{NewUser, UserId, UserRecord};

/// Data access for user records. Implementations must reject duplicate
/// usernames and emails atomically with the insert itself. Usernames match
/// exactly; emails match ignoring ASCII case.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by exact username.
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Find any user holding this username or this email.
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new user, returning its store-assigned id.
    async fn insert_user(&self, user: NewUser) -> Result<UserId, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;
}

/// `UserStore` backed by the sqlx SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_admin, must_change_password, created_at";

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ? LIMIT 1"
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let id = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_admin, must_change_password, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.must_change_password)
        .bind(&created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            StoreError::from_insert(
                e,
                &format!("username '{}' or email '{}'", user.username, user.email),
            )
        })?
        .last_insert_rowid();

        debug!(user_id = id, username = %user.username, "user row inserted");
        Ok(id)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

fn row_to_user(row: &SqliteRow) -> Result<UserRecord, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    let created_at = OffsetDateTime::parse(&created_at, &Rfc3339)
        .map_err(|e| StoreError::Corrupt(format!("created_at '{created_at}': {e}")))?;

    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        is_admin: row.try_get("is_admin")?,
        must_change_password: row.try_get("must_change_password")?,
        created_at,
    })
}
