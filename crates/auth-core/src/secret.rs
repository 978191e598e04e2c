//! Shared HMAC signing secret

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AuthError, Result};

/// Below this many bytes an HS256 key is weaker than the hash output.
pub const RECOMMENDED_SECRET_LEN: usize = 32;

/// Immutable secret shared by every codec instance of a deployment.
///
/// Provisioned out of band as base64 and decoded once at start-up. Cloning is
/// cheap and the bytes never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret {
    bytes: Arc<[u8]>,
}

impl SigningSecret {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(AuthError::ConfigError("signing secret is empty".to_string()));
        }
        if bytes.len() < RECOMMENDED_SECRET_LEN {
            tracing::warn!(
                len = bytes.len(),
                "Signing secret is shorter than recommended ({} bytes)",
                RECOMMENDED_SECRET_LEN
            );
        }
        Ok(Self { bytes: bytes.into() })
    }

    /// Decode a standard-alphabet base64 secret.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuthError::ConfigError(format!("signing secret is not valid base64: {}", e)))?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<redacted, {} bytes>)", self.bytes.len())
    }
}
