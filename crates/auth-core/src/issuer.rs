//! Access token and streaming credential issuance

use std::time::Duration;

use crate::claims::{AccessClaims, Role, StreamScope, StreamingClaims, TokenClaims};
use crate::codec::TokenCodec;
use crate::error::{AuthError, Result};

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_STREAM_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_LEGACY_STREAM_TTL: Duration = Duration::from_secs(60 * 60);

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken<C> {
    pub token: String,
    pub claims: C,
}

/// Mints access tokens for authenticated sessions.
#[derive(Debug, Clone)]
pub struct AccessTokenIssuer {
    codec: TokenCodec,
    ttl: Duration,
}

impl AccessTokenIssuer {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            ttl: DEFAULT_ACCESS_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal_id: i64, email: &str, role: Role) -> Result<IssuedToken<AccessClaims>> {
        let iat = self.codec.now();
        let claims = AccessClaims {
            sub: principal_id,
            email: email.to_string(),
            role,
            iat,
            exp: iat + self.ttl.as_secs(),
        };

        let token = self.codec.encode(&TokenClaims::Access(claims.clone()))?;
        tracing::debug!(principal_id, role = %role, exp = claims.exp, "Issued access token");

        Ok(IssuedToken { token, claims })
    }
}

/// Evidence that a store lookup matched a device to its owner.
///
/// The streaming issuer only mints device-scoped credentials from one of
/// these, so skipping the ownership check does not type-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipProof {
    principal_id: i64,
    device_id: String,
}

impl OwnershipProof {
    /// `owner_id` is the owner recorded on the device row.
    pub fn confirm(principal_id: i64, device_id: impl Into<String>, owner_id: i64) -> Result<Self> {
        let device_id = device_id.into();
        if principal_id != owner_id {
            return Err(AuthError::OwnershipDenied { device_id });
        }
        Ok(Self {
            principal_id,
            device_id,
        })
    }

    pub fn principal_id(&self) -> i64 {
        self.principal_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Mints topic-scoped credentials for the messaging layer.
#[derive(Debug, Clone)]
pub struct StreamingCredentialIssuer {
    codec: TokenCodec,
    device_ttl: Duration,
    legacy_ttl: Duration,
}

impl StreamingCredentialIssuer {
    pub fn new(codec: TokenCodec) -> Self {
        Self {
            codec,
            device_ttl: DEFAULT_STREAM_TTL,
            legacy_ttl: DEFAULT_LEGACY_STREAM_TTL,
        }
    }

    pub fn with_device_ttl(mut self, ttl: Duration) -> Self {
        self.device_ttl = ttl;
        self
    }

    pub fn with_legacy_ttl(mut self, ttl: Duration) -> Self {
        self.legacy_ttl = ttl;
        self
    }

    pub fn device_ttl(&self) -> Duration {
        self.device_ttl
    }

    pub fn legacy_ttl(&self) -> Duration {
        self.legacy_ttl
    }

    /// The single topic a device-scoped credential may subscribe to.
    pub fn device_topic(device_id: &str) -> String {
        format!("devices/{}", device_id)
    }

    /// Subscribe and publish patterns of the legacy broad grant.
    pub fn legacy_topics(user_id: i64) -> (Vec<String>, Vec<String>) {
        let subscribe = vec![
            format!("devices/{}/#", user_id),
            format!("user/{}/data", user_id),
            format!("user/{}/status", user_id),
        ];
        let publish = vec![format!("devices/{}/commands", user_id)];
        (subscribe, publish)
    }

    /// Device-bound credential: subscribe to `devices/{device_id}`, publish nowhere.
    pub fn issue(&self, proof: &OwnershipProof, email: &str) -> Result<IssuedToken<StreamingClaims>> {
        let scope = StreamScope::DeviceScoped {
            device_id: proof.device_id().to_string(),
        };
        self.sign(proof.principal_id(), email, scope)
    }

    /// Broad grant keyed only by the principal id.
    pub fn issue_legacy(&self, principal_id: i64, email: &str) -> Result<IssuedToken<StreamingClaims>> {
        self.sign(principal_id, email, StreamScope::LegacyBroad)
    }

    fn sign(&self, user_id: i64, email: &str, scope: StreamScope) -> Result<IssuedToken<StreamingClaims>> {
        let (subscribe_topics, publish_topics, ttl) = match &scope {
            StreamScope::DeviceScoped { device_id } => {
                (vec![Self::device_topic(device_id)], Vec::new(), self.device_ttl)
            }
            StreamScope::LegacyBroad => {
                let (subscribe, publish) = Self::legacy_topics(user_id);
                (subscribe, publish, self.legacy_ttl)
            }
        };

        let iat = self.codec.now();
        let claims = StreamingClaims {
            email: email.to_string(),
            user_id,
            scope,
            subscribe_topics,
            publish_topics,
            iat,
            exp: iat + ttl.as_secs(),
        };

        let token = self.codec.encode(&TokenClaims::Streaming(claims.clone()))?;
        tracing::info!(
            user_id,
            device_id = claims.scope.device_id().unwrap_or("-"),
            exp = claims.exp,
            "Issued streaming credential"
        );

        Ok(IssuedToken { token, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::secret::SigningSecret;
    use std::sync::Arc;

    fn codec_at(unix: i64) -> TokenCodec {
        let secret = SigningSecret::from_bytes(vec![7u8; 32]).unwrap();
        TokenCodec::with_clock(&secret, Arc::new(ManualClock::at_unix(unix)))
    }

    #[test]
    fn test_access_claims_use_ttl() {
        let issuer = AccessTokenIssuer::new(codec_at(5_000));
        let issued = issuer.issue(3, "u@example.com", Role::Admin).unwrap();

        assert_eq!(issued.claims.iat, 5_000);
        assert_eq!(issued.claims.exp, 5_000 + 1_800);
        assert_eq!(issued.claims.role, Role::Admin);
        assert_eq!(issued.token.split('.').count(), 3);
    }

    #[test]
    fn test_ownership_proof_rejects_foreign_owner() {
        let err = OwnershipProof::confirm(1, "dev_x", 2).unwrap_err();
        assert!(matches!(err, AuthError::OwnershipDenied { ref device_id } if device_id == "dev_x"));

        let proof = OwnershipProof::confirm(1, "dev_x", 1).unwrap();
        assert_eq!(proof.principal_id(), 1);
        assert_eq!(proof.device_id(), "dev_x");
    }

    #[test]
    fn test_device_credential_has_single_topic() {
        let issuer = StreamingCredentialIssuer::new(codec_at(100));
        let proof = OwnershipProof::confirm(9, "dev_abc123", 9).unwrap();
        let issued = issuer.issue(&proof, "u@example.com").unwrap();

        assert_eq!(issued.claims.subscribe_topics, vec!["devices/dev_abc123"]);
        assert!(issued.claims.publish_topics.is_empty());
        assert_eq!(issued.claims.exp - issued.claims.iat, 86_400);
        assert_eq!(issued.claims.scope.device_id(), Some("dev_abc123"));
    }

    #[test]
    fn test_legacy_credential_is_broad() {
        let issuer = StreamingCredentialIssuer::new(codec_at(100));
        let issued = issuer.issue_legacy(12, "u@example.com").unwrap();

        assert_eq!(
            issued.claims.subscribe_topics,
            vec!["devices/12/#", "user/12/data", "user/12/status"]
        );
        assert_eq!(issued.claims.publish_topics, vec!["devices/12/commands"]);
        assert_eq!(issued.claims.exp - issued.claims.iat, 3_600);
        assert_eq!(issued.claims.scope, StreamScope::LegacyBroad);
    }
}
