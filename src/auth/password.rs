use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use serde::Deserialize;
use tracing::error;

use crate::auth::error::{AuthError, AuthResult};

pub const DEFAULT_BCRYPT_COST: u32 = 12;
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 12;
/// bcrypt ignores everything past this many bytes of input.
pub const MAX_BCRYPT_PASSWORD_BYTES: usize = 72;

/// Scheme used for newly written hashes. Verification always follows the
/// prefix of the stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    #[default]
    Bcrypt,
    Argon2,
}

impl std::str::FromStr for HashScheme {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bcrypt" => Ok(Self::Bcrypt),
            "argon2" | "argon2id" => Ok(Self::Argon2),
            other => Err(AuthError::InvalidInput(format!(
                "unknown password scheme '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    scheme: HashScheme,
    bcrypt_cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            scheme: HashScheme::Bcrypt,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl PasswordHasher {
    pub fn new(scheme: HashScheme, bcrypt_cost: u32) -> AuthResult<Self> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(AuthError::InvalidInput(format!(
                "bcrypt cost {bcrypt_cost} outside {MIN_BCRYPT_COST}..={MAX_BCRYPT_COST}"
            )));
        }
        Ok(Self { scheme, bcrypt_cost })
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Rejects passwords the configured scheme would silently truncate.
    pub fn check_length(&self, plain: &str) -> AuthResult<()> {
        if self.scheme == HashScheme::Bcrypt && plain.len() > MAX_BCRYPT_PASSWORD_BYTES {
            return Err(AuthError::InvalidInput(format!(
                "password longer than {MAX_BCRYPT_PASSWORD_BYTES} bytes"
            )));
        }
        Ok(())
    }

    pub fn hash(&self, plain: &str) -> AuthResult<String> {
        self.check_length(plain)?;
        match self.scheme {
            HashScheme::Bcrypt => bcrypt::hash(plain, self.bcrypt_cost).map_err(|e| {
                error!(error = %e, "bcrypt hash error");
                AuthError::Hashing(e.to_string())
            }),
            HashScheme::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(plain.as_bytes(), &salt)
                    .map_err(|e| {
                        error!(error = %e, "argon2 hash_password error");
                        AuthError::Hashing(e.to_string())
                    })?
                    .to_string();
                Ok(hash)
            }
        }
    }

    /// Checks `plain` against a stored hash of either scheme.
    pub fn verify(&self, plain: &str, hash: &str) -> AuthResult<bool> {
        if is_bcrypt_hash(hash) {
            // no stored bcrypt hash can stand for a longer password
            if plain.len() > MAX_BCRYPT_PASSWORD_BYTES {
                return Ok(false);
            }
            return bcrypt::verify(plain, hash).map_err(|e| {
                error!(error = %e, "bcrypt verify error");
                AuthError::Hashing(e.to_string())
            });
        }

        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AuthError::Hashing(e.to_string())
        })?;
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Hashing(e.to_string())),
        }
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
