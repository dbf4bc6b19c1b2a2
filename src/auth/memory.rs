use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::error::StoreError;
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, UserId, UserRecord};

/// Process-local `UserStore`. The uniqueness check and the insert run under
/// one lock, so concurrent registrations cannot both win. Emails compare
/// ASCII case-insensitively, like the `NOCASE` column in SQLite.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .iter()
            .find(|u| u.username == username || u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserId, StoreError> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.username == user.username || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate(format!(
                "username '{}' or email '{}'",
                user.username, user.email
            )));
        }

        let id = users.last().map(|u| u.id + 1).unwrap_or(1);
        users.push(UserRecord {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            is_admin: user.is_admin,
            must_change_password: user.must_change_password,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        Ok(self.users.lock().await.len() as i64)
    }
}
