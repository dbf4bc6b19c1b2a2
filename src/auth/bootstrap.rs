use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};

use crate::auth::{
    error::{AuthError, AuthResult},
    repo_types::UserId,
    services::AuthService,
};

pub const ADMIN_USERNAME: &str = "admin";
const GENERATED_PASSWORD_LEN: usize = 20;

/// Account details used when the admin record is missing.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    AlreadyPresent,
    Created {
        id: UserId,
        /// Set when no password was configured and one was generated.
        generated_password: Option<String>,
    },
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Creates the `admin` account if it does not exist yet. Never touches an
/// existing record.
pub async fn ensure_admin(service: &AuthService, seed: &AdminSeed) -> AuthResult<BootstrapOutcome> {
    if service.store().find_user(ADMIN_USERNAME).await?.is_some() {
        info!("admin user already exists, skipping bootstrap");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let (password, generated) = match &seed.password {
        Some(p) => (p.clone(), false),
        None => (generate_password(), true),
    };

    match service
        .register(ADMIN_USERNAME, &seed.email, &password, true)
        .await
    {
        Ok(id) => {
            if generated {
                warn!(
                    user_id = id,
                    "created admin user with a generated password; set ADMIN_PASSWORD to choose one"
                );
                // stderr only, so the secret stays out of shipped log streams
                eprintln!("generated password for user '{ADMIN_USERNAME}': {password}");
            } else {
                info!(user_id = id, "created admin user");
            }
            Ok(BootstrapOutcome::Created {
                id,
                generated_password: generated.then_some(password),
            })
        }
        Err(AuthError::DuplicateCredential) => {
            // Lost to a concurrent bootstrap, or the seed email belongs to someone else.
            if service.store().find_user(ADMIN_USERNAME).await?.is_some() {
                Ok(BootstrapOutcome::AlreadyPresent)
            } else {
                Err(AuthError::DuplicateCredential)
            }
        }
        Err(e) => Err(e),
    }
}
