//! Token settings and the wiring of auth-core's codec, issuers and guard

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use iotp_auth_core::{
    AccessTokenIssuer, Clock, SigningSecret, StreamingCredentialIssuer, SystemClock, TokenCodec,
    TokenGuard,
};
use serde::Deserialize;

use crate::{Error, Result};

/// JWT configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Base64 HMAC secret shared with the messaging layer.
    pub secret_base64: Option<String>,
    pub access_ttl_seconds: u64,
    pub stream_ttl_seconds: u64,
    pub legacy_stream_ttl_seconds: u64,
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret_base64: None,
            access_ttl_seconds: 1800,      // 30 minutes
            stream_ttl_seconds: 86400,     // 24 hours
            legacy_stream_ttl_seconds: 3600,
            leeway_seconds: 0,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret_base64", &self.secret_base64.as_ref().map(|_| "<redacted>"))
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("stream_ttl_seconds", &self.stream_ttl_seconds)
            .field("legacy_stream_ttl_seconds", &self.legacy_stream_ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl JwtConfig {
    pub fn with_secret(secret_base64: impl Into<String>) -> Self {
        Self {
            secret_base64: Some(secret_base64.into()),
            ..Default::default()
        }
    }

    pub fn signing_secret(&self) -> Result<SigningSecret> {
        let encoded = self
            .secret_base64
            .as_deref()
            .ok_or_else(|| Error::Config("jwt.secret_base64 is not set".to_string()))?;
        SigningSecret::from_base64(encoded).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.signing_secret()?;
        for (name, ttl) in [
            ("access_ttl_seconds", self.access_ttl_seconds),
            ("stream_ttl_seconds", self.stream_ttl_seconds),
            ("legacy_stream_ttl_seconds", self.legacy_stream_ttl_seconds),
        ] {
            if ttl == 0 {
                return Err(Error::Config(format!("jwt.{} must be positive", name)));
            }
        }
        Ok(())
    }
}

/// Codec, issuers and guard built from one secret and one clock.
#[derive(Debug, Clone)]
pub struct TokenServices {
    pub codec: TokenCodec,
    pub access: AccessTokenIssuer,
    pub streaming: StreamingCredentialIssuer,
    pub guard: TokenGuard,
}

impl TokenServices {
    pub fn new(config: &JwtConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let secret = config.signing_secret()?;
        let codec = TokenCodec::with_clock(&secret, clock).with_leeway(config.leeway_seconds);

        let access = AccessTokenIssuer::new(codec.clone())
            .with_ttl(Duration::from_secs(config.access_ttl_seconds));
        let streaming = StreamingCredentialIssuer::new(codec.clone())
            .with_device_ttl(Duration::from_secs(config.stream_ttl_seconds))
            .with_legacy_ttl(Duration::from_secs(config.legacy_stream_ttl_seconds));
        let guard = TokenGuard::new(codec.clone());

        Ok(Self {
            codec,
            access,
            streaming,
            guard,
        })
    }
}
