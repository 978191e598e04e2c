//! # Users-Core
//!
//! Principal, device and credential service for the IOTP platform.
//!
//! This crate provides:
//! - Principal and device storage in SQLite
//! - Password authentication with Argon2
//! - Access token and device-bound streaming credential issuance
//! - REST API with per-client rate limiting
//!
//! ## Architecture
//!
//! Users-Core owns the stores and decides *who* gets a credential; the token
//! model itself (claims, signing, verification) lives in `iotp-auth-core`,
//! which the messaging layer can depend on alone to verify streaming tokens.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod hasher;
pub mod jwt;
pub mod logging;
pub mod store;
pub mod types;
pub mod validation;

use std::sync::Arc;

pub use auth::{AuthenticationResult, AuthenticationService};
pub use config::UsersConfig;
pub use error::{Error, Result};
pub use hasher::CredentialHasher;
pub use jwt::{JwtConfig, TokenServices};
pub use store::{DeviceStore, PrincipalStore, SqliteStore};
pub use types::{CreateDeviceRequest, Device, LoginRequest, Principal, RegisterRequest, StreamTokenRequest};

/// Initialize the users-core service
pub async fn init(config: UsersConfig) -> Result<AuthenticationService> {
    let tokens = TokenServices::new(&config.jwt)?;
    init_with_tokens(config, tokens).await
}

/// Like [`init`] but with pre-built token services, e.g. on a manual clock.
pub async fn init_with_tokens(config: UsersConfig, tokens: TokenServices) -> Result<AuthenticationService> {
    let store = Arc::new(SqliteStore::new(&config.database_url).await?);

    AuthenticationService::new(
        store.clone(),
        store,
        tokens,
        config.password,
        config.streaming,
    )
}
