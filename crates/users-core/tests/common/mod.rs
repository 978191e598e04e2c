//! Shared harness for users-core integration tests

#![allow(dead_code)]

use std::sync::Arc;

use iotp_auth_core::{Clock, ManualClock};
use iotp_users_core::config::{PasswordConfig, StreamingConfig};
use iotp_users_core::{AuthenticationService, JwtConfig, TokenServices, UsersConfig};
use tempfile::TempDir;

pub const SECRET: &str = "WsNiwFBf2CJqVRz8/9OT58zgsXtRqArsUtvoeFrI+rc=";
pub const START: i64 = 1_700_000_000;

pub struct Harness {
    pub service: Arc<AuthenticationService>,
    pub clock: Arc<ManualClock>,
    _temp_dir: TempDir,
}

pub fn test_config(temp_dir: &TempDir, allow_legacy: bool) -> UsersConfig {
    let db_path = temp_dir.path().join("iotp.db");
    UsersConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        jwt: JwtConfig::with_secret(SECRET),
        password: PasswordConfig::fast_for_tests(),
        streaming: StreamingConfig {
            allow_legacy_broad_grant: allow_legacy,
        },
        ..Default::default()
    }
}

pub async fn harness() -> Harness {
    harness_with(false).await
}

pub async fn harness_with(allow_legacy: bool) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&temp_dir, allow_legacy);

    let clock = Arc::new(ManualClock::at_unix(START));
    let shared: Arc<dyn Clock> = clock.clone();
    let tokens = TokenServices::with_clock(&config.jwt, shared).unwrap();
    let service = iotp_users_core::init_with_tokens(config, tokens).await.unwrap();

    Harness {
        service: Arc::new(service),
        clock,
        _temp_dir: temp_dir,
    }
}
