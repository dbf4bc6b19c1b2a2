use anyhow::Context;
use serde::Deserialize;

use crate::auth::{
    bootstrap::AdminSeed,
    password::{HashScheme, PasswordHasher, DEFAULT_BCRYPT_COST},
};

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub scheme: HashScheme,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub db: DbConfig,
    pub password: PasswordConfig,
    pub admin: AdminConfig,
    pub host: String,
    pub port: u16,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key}={v:?}: {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = DbConfig {
            url: env_or("DATABASE_URL", "sqlite://sheetgate.db"),
            max_connections: parse_env("DB_MAX_CONNECTIONS", 5)?,
        };
        let password = PasswordConfig {
            scheme: parse_env("PASSWORD_SCHEME", HashScheme::Bcrypt)?,
            bcrypt_cost: parse_env("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
        };
        let admin = AdminConfig {
            email: env_or("ADMIN_EMAIL", "admin@localhost.localdomain"),
            password: std::env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),
        };
        let config = Self {
            db,
            password,
            admin,
            host: env_or("APP_HOST", "0.0.0.0"),
            port: parse_env("APP_PORT", 8080)?,
        };
        config.password_hasher().context("BCRYPT_COST")?;
        Ok(config)
    }

    pub fn password_hasher(&self) -> anyhow::Result<PasswordHasher> {
        Ok(PasswordHasher::new(
            self.password.scheme,
            self.password.bcrypt_cost,
        )?)
    }

    pub fn admin_seed(&self) -> AdminSeed {
        AdminSeed {
            email: self.admin.email.clone(),
            password: self.admin.password.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_reports_the_variable() {
        std::env::set_var("SHEETGATE_TEST_PORT", "not-a-port");
        let err = parse_env::<u16>("SHEETGATE_TEST_PORT", 1).unwrap_err();
        assert!(err.to_string().contains("SHEETGATE_TEST_PORT"));
        std::env::remove_var("SHEETGATE_TEST_PORT");
    }

    #[test]
    fn parse_env_falls_back_to_default() {
        let v = parse_env::<u32>("SHEETGATE_TEST_UNSET_VALUE", 42).unwrap();
        assert_eq!(v, 42);
    }
}
