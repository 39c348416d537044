use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::allocation::BookingPolicy;
use crate::auth::{AuthConfig, DEFAULT_SESSION_COOKIE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Process settings, read from the environment (after `.env` is loaded).
/// Keys are the lowercased variable names, e.g. `PG_DATABASE_URL`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bind_address: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub pg_database_url: Option<String>,
    pub db_workers: usize,
    /// Empty disables the layout cache.
    pub redis_database_uri: Option<String>,
    pub layout_cache_ttl_s: u64,
    pub session_cookie: String,
    pub admin_roles: String,
    pub auth_redirect_to: String,
    pub reservation_slot_minutes: i64,
    pub cors_origin: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(Environment::default())
    }

    pub fn from_source(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("bind_address", "127.0.0.1")?
            .set_default("port", 8080)?
            .set_default("storage_backend", "postgres")?
            .set_default("db_workers", 5)?
            .set_default("layout_cache_ttl_s", 300)?
            .set_default("session_cookie", DEFAULT_SESSION_COOKIE)?
            .set_default("admin_roles", "admin")?
            .set_default("auth_redirect_to", "/")?
            .set_default("reservation_slot_minutes", 120)?
            .add_source(env)
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_backend == StorageBackend::Postgres && self.pg_url().is_none() {
            return Err(ConfigError::Message("PG_DATABASE_URL must be set".into()));
        }
        if self.reservation_slot_minutes <= 0 {
            return Err(ConfigError::Message("RESERVATION_SLOT_MINUTES must be positive".into()));
        }
        if self.db_workers == 0 {
            return Err(ConfigError::Message("DB_WORKERS must be at least 1".into()));
        }
        Ok(())
    }

    pub fn pg_url(&self) -> Option<&str> {
        self.pg_database_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    pub fn redis_uri(&self) -> Option<&str> {
        self.redis_database_uri.as_deref().filter(|uri| !uri.trim().is_empty())
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            session_cookie: self.session_cookie.clone(),
            admin_roles: self
                .admin_roles
                .split(',')
                .map(|role| role.trim().to_owned())
                .filter(|role| !role.is_empty())
                .collect(),
            redirect_to: self.auth_redirect_to.clone(),
        }
    }

    pub fn policy(&self) -> BookingPolicy {
        BookingPolicy::with_slot_minutes(self.reservation_slot_minutes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    #[test]
    fn defaults_apply_for_memory_backend() {
        let settings = Settings::from_source(env(&[("STORAGE_BACKEND", "memory")])).unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.storage_backend, StorageBackend::Memory);
        assert_eq!(settings.redis_uri(), None);
        assert_eq!(settings.auth().admin_roles, vec!["admin".to_owned()]);
        assert_eq!(settings.policy().slot.num_minutes(), 120);
    }

    #[test]
    fn postgres_backend_needs_a_url() {
        assert!(Settings::from_source(env(&[])).is_err());

        let settings = Settings::from_source(env(&[
            ("PG_DATABASE_URL", "postgres://localhost/tablebook"),
            ("PORT", "9000"),
            ("ADMIN_ROLES", "admin, owner"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.auth().admin_roles, vec!["admin".to_owned(), "owner".to_owned()]);
    }
}
