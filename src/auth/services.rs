use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    error::{AuthError, AuthResult},
    password::PasswordHasher,
    repo::UserStore,
    repo_types::{NewUser, UserId, UserRecord},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration and login against an injected `UserStore`.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Creates a new account with `must_change_password` set. The email is
    /// stored as spelled; the store compares it case-insensitively.
    ///
    /// The lookup below is only a fast path; the store's unique constraints
    /// decide races between concurrent registrations.
    #[instrument(skip(self, email, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> AuthResult<UserId> {
        let email = email.trim();

        if username.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".into()));
        }
        if username.trim() != username {
            return Err(AuthError::InvalidInput(
                "username must not start or end with whitespace".into(),
            ));
        }
        if !is_valid_email(email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::InvalidInput("invalid email".into()));
        }
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }
        self.hasher.check_length(password)?;

        if self
            .store
            .find_user_by_username_or_email(username, email)
            .await?
            .is_some()
        {
            warn!(username, email = %email, "username or email already registered");
            return Err(AuthError::DuplicateCredential);
        }

        let password_hash = self.hasher.hash(password)?;

        let id = self
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                is_admin,
                must_change_password: true,
            })
            .await
            .map_err(|e| {
                let err = AuthError::from(e);
                match &err {
                    AuthError::DuplicateCredential => {
                        warn!(username, "lost registration race on unique constraint")
                    }
                    other => error!(error = %other, "insert_user failed"),
                }
                err
            })?;

        info!(user_id = id, username, email = %email, is_admin, "user registered");
        Ok(id)
    }

    /// Returns the stored record when `password` matches the user whose name
    /// is exactly `username`. Unknown users and wrong passwords fail identically.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<UserRecord> {
        let user = match self.store.find_user(username).await? {
            Some(u) => u,
            None => {
                warn!(username, "login unknown username");
                return Err(AuthError::InvalidCredential);
            }
        };

        let ok = match self.hasher.verify(password, &user.password_hash) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, user_id = user.id, "stored password hash unreadable");
                false
            }
        };

        if !ok {
            warn!(username, user_id = user.id, "login invalid password");
            return Err(AuthError::InvalidCredential);
        }

        info!(user_id = user.id, username, "user authenticated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{
        error::StoreError,
        memory::MemoryUserStore,
        password::{HashScheme, MIN_BCRYPT_COST},
        repo::SqliteUserStore,
    };
    use crate::db;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashScheme::Bcrypt, MIN_BCRYPT_COST).unwrap()
    }

    fn memory_service() -> AuthService {
        AuthService::new(Arc::new(MemoryUserStore::new()), hasher())
    }

    async fn sqlite_service() -> AuthService {
        let pool = db::in_memory().await.expect("in-memory db");
        AuthService::new(Arc::new(SqliteUserStore::new(pool)), hasher())
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn alice_scenario() {
        let svc = sqlite_service().await;

        let id = svc
            .register("alice", "a@x.com", "Secret123!", false)
            .await
            .expect("register alice");

        let user = svc.authenticate("alice", "Secret123!").await.expect("login");
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_admin);
        assert!(user.must_change_password);

        assert!(matches!(
            svc.authenticate("alice", "wrong").await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            svc.register("alice", "other@x.com", "x", false).await,
            Err(AuthError::DuplicateCredential)
        ));
    }

    #[tokio::test]
    async fn unknown_user_fails_like_wrong_password() {
        let svc = memory_service();
        svc.register("bob", "b@x.com", "hunter22", false).await.unwrap();

        let unknown = svc.authenticate("nobody", "hunter22").await.unwrap_err();
        let wrong = svc.authenticate("bob", "hunter23").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredential));
        assert!(matches!(wrong, AuthError::InvalidCredential));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn duplicate_email_leaves_count_unchanged() {
        let svc = sqlite_service().await;
        svc.register("carol", "c@x.com", "pw", false).await.unwrap();

        let err = svc
            .register("caroline", "C@X.com ", "pw", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateCredential));
        assert_eq!(svc.store().count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mixed_case_email_is_returned_as_registered() {
        for svc in [memory_service(), sqlite_service().await] {
            svc.register("alice", "Alice@X.com", "Secret123!", false)
                .await
                .unwrap();

            let user = svc.authenticate("alice", "Secret123!").await.unwrap();
            assert_eq!(user.username, "alice");
            assert_eq!(user.email, "Alice@X.com");

            assert!(matches!(
                svc.register("alicia", "alice@x.com", "pw", false).await,
                Err(AuthError::DuplicateCredential)
            ));
            assert_eq!(svc.store().count_users().await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn username_must_match_exactly() {
        let svc = sqlite_service().await;
        svc.register("bob", "b@x.com", "hunter22", false).await.unwrap();

        for name in [" bob ", "bob ", " bob", "Bob"] {
            assert!(
                matches!(
                    svc.authenticate(name, "hunter22").await,
                    Err(AuthError::InvalidCredential)
                ),
                "{name:?}"
            );
        }
        assert!(svc.authenticate("bob", "hunter22").await.is_ok());
    }

    #[tokio::test]
    async fn padded_username_is_rejected_at_registration() {
        let svc = memory_service();
        let err = svc
            .register(" bob ", "b@x.com", "hunter22", false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert_eq!(svc.store().count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn password_sharing_first_72_bytes_does_not_log_in() {
        let svc = sqlite_service().await;
        let prefix = "a".repeat(72);

        let err = svc
            .register("long", "long@x.com", &format!("{prefix}ORIGINAL"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
        assert_eq!(svc.store().count_users().await.unwrap(), 0);

        svc.register("long", "long@x.com", &prefix, false).await.unwrap();
        assert!(matches!(
            svc.authenticate("long", &format!("{prefix}WRONG")).await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(svc.authenticate("long", &prefix).await.is_ok());
    }

    #[tokio::test]
    async fn long_passwords_work_under_argon2() {
        let svc = AuthService::new(
            Arc::new(MemoryUserStore::new()),
            PasswordHasher::new(HashScheme::Argon2, MIN_BCRYPT_COST).unwrap(),
        );
        let prefix = "a".repeat(72);
        svc.register("long", "long@x.com", &format!("{prefix}ORIGINAL"), false)
            .await
            .unwrap();
        assert!(matches!(
            svc.authenticate("long", &format!("{prefix}WRONG")).await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(svc
            .authenticate("long", &format!("{prefix}ORIGINAL"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn same_password_stored_with_different_salts() {
        let svc = memory_service();
        svc.register("u1", "u1@x.com", "shared-pw", false).await.unwrap();
        svc.register("u2", "u2@x.com", "shared-pw", false).await.unwrap();

        let u1 = svc.store().find_user("u1").await.unwrap().unwrap();
        let u2 = svc.store().find_user("u2").await.unwrap().unwrap();
        assert_ne!(u1.password_hash, u2.password_hash);
        assert_ne!(u1.password_hash, "shared-pw");

        assert!(svc.authenticate("u1", "shared-pw").await.is_ok());
        assert!(svc.authenticate("u2", "shared-pw").await.is_ok());
    }

    #[tokio::test]
    async fn admin_flag_is_stored() {
        let svc = memory_service();
        svc.register("root", "root@x.com", "pw", true).await.unwrap();
        let user = svc.authenticate("root", "pw").await.unwrap();
        assert!(user.is_admin);
    }

    #[tokio::test]
    async fn rejects_blank_fields_without_touching_store() {
        let svc = memory_service();
        let cases = [
            ("  ", "a@x.com", "pw"),
            ("a", "not-an-email", "pw"),
            ("a", "a@x.com", ""),
        ];
        for (u, e, p) in cases {
            let err = svc.register(u, e, p, false).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidInput(_)), "{u:?} {e:?} {p:?}");
        }
        assert_eq!(svc.store().count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unreadable_stored_hash_is_an_invalid_credential() {
        let store = Arc::new(MemoryUserStore::new());
        store
            .insert_user(NewUser {
                username: "legacy".into(),
                email: "l@x.com".into(),
                password_hash: "plaintext?".into(),
                is_admin: false,
                must_change_password: true,
            })
            .await
            .unwrap();
        let svc = AuthService::new(store, hasher());
        assert!(matches!(
            svc.authenticate("legacy", "plaintext?").await,
            Err(AuthError::InvalidCredential)
        ));
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl UserStore for DownStore {
        async fn find_user(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn find_user_by_username_or_email(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn insert_user(&self, _: NewUser) -> Result<UserId, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn count_users(&self) -> Result<i64, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    #[tokio::test]
    async fn store_failures_surface_as_unavailable() {
        let svc = AuthService::new(Arc::new(DownStore), hasher());
        assert!(matches!(
            svc.authenticate("a", "b").await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(matches!(
            svc.register("a", "a@x.com", "b", false).await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }
}
