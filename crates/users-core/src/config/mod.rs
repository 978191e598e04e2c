//! Configuration for users-core
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `IOTP__*` environment variables (`IOTP__JWT__SECRET_BASE64`,
//! `IOTP__RATE_LIMIT__AUTH_PER_MINUTE`, ...). The bare `JWT_SECRET_BASE64`
//! and `DATABASE_URL` variables are honoured when nothing else set them.

use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::rate_limit::RateLimitConfig;
use crate::jwt::JwtConfig;
use crate::logging::LoggingConfig;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub database_url: String,
    pub api_bind_address: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub streaming: StreamingConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Password policy and hashing cost
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub argon2_memory_cost: u32,
    pub argon2_time_cost: u32,
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Serve the wildcard, user-keyed grant when no device is named.
    pub allow_legacy_broad_grant: bool,
}

impl UsersConfig {
    /// Load from the optional file at `path` and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("IOTP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: UsersConfig = settings.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment only.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    fn apply_legacy_env(&mut self) {
        if self.jwt.secret_base64.is_none() {
            self.jwt.secret_base64 = std::env::var("JWT_SECRET_BASE64").ok();
        }
        if self.database_url == default_database_url() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.database_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(Error::Config("database_url must not be empty".to_string()));
        }
        self.jwt.validate()?;
        self.password.validate()?;
        Ok(())
    }
}

fn default_database_url() -> String {
    "sqlite://iotp.db?mode=rwc".to_string()
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            api_bind_address: "0.0.0.0:8000".to_string(),
            jwt: JwtConfig::default(),
            password: PasswordConfig::default(),
            streaming: StreamingConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PasswordConfig {
    /// Cheap argon2 parameters so test suites stay fast.
    pub fn fast_for_tests() -> Self {
        Self {
            argon2_memory_cost: 4096,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_length == 0 || self.min_length > self.max_length {
            return Err(Error::Config(format!(
                "password length bounds are inconsistent: {}..={}",
                self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            argon2_memory_cost: 19456,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
        }
    }
}
