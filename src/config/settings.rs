//! Runtime settings, read from the environment.

use crate::error::ConfigError;
use crate::query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use std::str::FromStr;

/// Signing secret used when `JWT_SECRET` is unset. Development only.
pub const DEV_JWT_SECRET: &str = "celestial-api-dev-secret-change-me";

/// Longest accepted access-token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl HashCost {
    /// Cheapest cost argon2 accepts. For tests.
    pub const fn cheap() -> Self {
        HashCost { memory_kib: 8, iterations: 1 }
    }
}

impl Default for HashCost {
    fn default() -> Self {
        HashCost { memory_kib: 19_456, iterations: 2 }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub default_page_size: u32,
    pub hash_cost: HashCost,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            db_max_connections: 5,
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_minutes: 60,
            default_page_size: DEFAULT_PAGE_SIZE,
            hash_cost: HashCost::default(),
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using the development secret");
                defaults.jwt_secret
            }
        };

        let settings = Settings {
            database_url: get("DATABASE_URL"),
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            jwt_secret,
            token_ttl_minutes: parse(&get, "TOKEN_TTL_MINUTES", defaults.token_ttl_minutes)?,
            default_page_size: parse(&get, "DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            hash_cost: HashCost {
                memory_kib: parse(&get, "PASSWORD_HASH_MEMORY_KIB", defaults.hash_cost.memory_kib)?,
                iterations: parse(&get, "PASSWORD_HASH_ITERATIONS", defaults.hash_cost.iterations)?,
            },
        };
        settings.check()?;
        Ok(settings)
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = secret.into();
        self
    }

    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_minutes = minutes;
        self
    }

    pub fn with_default_page_size(mut self, size: u32) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_hash_cost(mut self, cost: HashCost) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Reject values the rest of the crate cannot work with.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(invalid("JWT_SECRET", "must not be empty"));
        }
        if self.db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.token_ttl_minutes) {
            return Err(invalid(
                "TOKEN_TTL_MINUTES",
                format!("must be between 1 and {}", MAX_TOKEN_TTL_MINUTES),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > MAX_PAGE_SIZE {
            return Err(invalid(
                "DEFAULT_PAGE_SIZE",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }
        if self.hash_cost.memory_kib < 8 {
            return Err(invalid("PASSWORD_HASH_MEMORY_KIB", "must be at least 8"));
        }
        if self.hash_cost.iterations == 0 {
            return Err(invalid("PASSWORD_HASH_ITERATIONS", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSetting { name, reason: reason.into() }
}

fn parse<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| invalid(name, format!("{:?}: {}", raw, e))),
        None => Ok(default),
    }
}
