use thiserror::Error;

/// Failures raised by a `UserStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt user row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Maps a sqlx error, turning unique-constraint violations into `Duplicate`.
    pub fn from_insert(err: sqlx::Error, what: &str) -> Self {
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            Self::Duplicate(what.to_string())
        } else {
            Self::Database(err)
        }
    }
}

/// Errors returned by registration, authentication and bootstrap.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username or email already registered")]
    DuplicateCredential,

    #[error("invalid username or password")]
    InvalidCredential,

    #[error("user store unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::DuplicateCredential,
            other => Self::StoreUnavailable(other),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
