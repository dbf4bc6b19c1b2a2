use crate::auth::{memory::MemoryUserStore, repo::SqliteUserStore, AuthService, UserStore};
use crate::config::AppConfig;
use crate::db;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let pool = db::connect(&config.db).await?;
        let store = Arc::new(SqliteUserStore::new(pool)) as Arc<dyn UserStore>;

        let auth = AuthService::new(store, config.password_hasher()?);
        Ok(Self { auth, config })
    }

    pub fn from_parts(auth: AuthService, config: Arc<AppConfig>) -> Self {
        Self { auth, config }
    }

    /// State over an empty `MemoryUserStore` with the cheapest allowed bcrypt cost.
    pub fn fake() -> Self {
        use crate::auth::password::{HashScheme, PasswordHasher, MIN_BCRYPT_COST};
        use crate::config::{AdminConfig, DbConfig, PasswordConfig};

        let config = Arc::new(AppConfig {
            db: DbConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            password: PasswordConfig {
                scheme: HashScheme::Bcrypt,
                bcrypt_cost: MIN_BCRYPT_COST,
            },
            admin: AdminConfig {
                email: "admin@example.com".into(),
                password: Some("changeme".into()),
            },
            host: "127.0.0.1".into(),
            port: 0,
        });

        let hasher = PasswordHasher::new(HashScheme::Bcrypt, MIN_BCRYPT_COST)
            .unwrap_or_default();
        let store = Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>;
        Self {
            auth: AuthService::new(store, hasher),
            config,
        }
    }
}
