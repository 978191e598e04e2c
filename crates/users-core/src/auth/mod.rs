//! Authentication service
//!
//! Orchestrates the stores, the credential hasher and the token services:
//! registration and login produce access tokens, bearer tokens are resolved
//! to principals, and streaming credentials are only minted after the device
//! store confirms ownership.

use std::sync::Arc;
use std::time::Duration;

use iotp_auth_core::{IssuedToken, OwnershipProof, StreamingClaims};
use validator::Validate;

use crate::config::{PasswordConfig, StreamingConfig};
use crate::hasher::CredentialHasher;
use crate::jwt::TokenServices;
use crate::store::{DeviceStore, PrincipalStore};
use crate::types::{CreateDeviceRequest, Device, LoginRequest, NewDevice, NewPrincipal, Principal, RegisterRequest};
use crate::validation::{normalize_email, validate_device_id, validate_device_name, validate_email, validate_password};
use crate::{Error, Result};

/// Verified against when the email is unknown so both paths cost one hash.
const TIMING_EQUALIZER: &str = "iotp-timing-equalizer";

/// Result of authentication
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub principal: Principal,
    pub access_token: String,
    pub expires_in: Duration,
}

/// Authentication service
pub struct AuthenticationService {
    principals: Arc<dyn PrincipalStore>,
    devices: Arc<dyn DeviceStore>,
    hasher: CredentialHasher,
    tokens: TokenServices,
    password_policy: PasswordConfig,
    streaming: StreamingConfig,
    dummy_digest: String,
}

impl AuthenticationService {
    pub fn new(
        principals: Arc<dyn PrincipalStore>,
        devices: Arc<dyn DeviceStore>,
        tokens: TokenServices,
        password_policy: PasswordConfig,
        streaming: StreamingConfig,
    ) -> Result<Self> {
        password_policy.validate()?;
        let hasher = CredentialHasher::new(&password_policy)?;
        let dummy_digest = hasher.hash(TIMING_EQUALIZER)?;

        Ok(Self {
            principals,
            devices,
            hasher,
            tokens,
            password_policy,
            streaming,
            dummy_digest,
        })
    }

    pub fn tokens(&self) -> &TokenServices {
        &self.tokens
    }

    pub fn access_ttl(&self) -> Duration {
        self.tokens.access.ttl()
    }

    /// Create a non-admin principal and log it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthenticationResult> {
        let email = normalize_email(&request.email);
        let request = RegisterRequest { email, ..request };
        request.validate()?;
        validate_email(&request.email).map_err(|e| Error::Validation(format!("email: {}", e)))?;
        validate_password(&request.password, &self.password_policy)
            .map_err(|e| Error::Validation(e.to_string()))?;

        if self.principals.find_principal_by_email(&request.email).await?.is_some() {
            return Err(Error::EmailAlreadyRegistered(request.email));
        }

        let password_hash = self.hasher.hash_blocking(request.password).await?;
        let principal = self
            .principals
            .create_principal(NewPrincipal {
                email: request.email,
                password_hash,
                is_admin: false,
            })
            .await?;

        tracing::info!(principal_id = principal.id, "Registered principal");
        self.start_session(principal)
    }

    /// Exchange email and password for an access token.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthenticationResult> {
        let email = normalize_email(&request.email);
        let found = self.principals.find_principal_by_email(&email).await?;

        let digest = found
            .as_ref()
            .map(|p| p.password_hash.clone())
            .unwrap_or_else(|| self.dummy_digest.clone());
        let password_ok = self.hasher.verify_blocking(request.password, digest).await?;

        match found {
            Some(principal) if password_ok => {
                tracing::info!(principal_id = principal.id, "Login succeeded");
                self.start_session(principal)
            }
            _ => {
                tracing::info!("Login rejected");
                Err(Error::InvalidCredentials)
            }
        }
    }

    fn start_session(&self, principal: Principal) -> Result<AuthenticationResult> {
        let issued = self
            .tokens
            .access
            .issue(principal.id, &principal.email, principal.role())?;

        Ok(AuthenticationResult {
            principal,
            expires_in: Duration::from_secs(issued.claims.exp.saturating_sub(issued.claims.iat)),
            access_token: issued.token,
        })
    }

    /// Resolve a bearer access token to the principal it names.
    pub async fn authenticate_bearer(&self, token: &str) -> Result<Principal> {
        let claims = self.tokens.guard.authorize_access(token).map_err(|e| {
            tracing::debug!(reason = e.label(), "Bearer token rejected: {}", e);
            Error::Auth(e)
        })?;

        self.principals
            .find_principal(claims.principal_id())
            .await?
            .ok_or(Error::PrincipalNotFound(claims.principal_id()))
    }

    /// Device-bound streaming credential for a device `principal` owns.
    pub async fn issue_stream_credential(
        &self,
        principal: &Principal,
        device_id: &str,
    ) -> Result<IssuedToken<StreamingClaims>> {
        let device = self
            .devices
            .find_owned_device_by_device_id(device_id, principal.id)
            .await?;

        let proof = match device {
            Some(device) => OwnershipProof::confirm(principal.id, device.device_id, device.owner_id)?,
            None => {
                tracing::warn!(principal_id = principal.id, device_id, "Streaming credential refused: device not owned");
                return Err(iotp_auth_core::AuthError::OwnershipDenied {
                    device_id: device_id.to_string(),
                }
                .into());
            }
        };

        Ok(self.tokens.streaming.issue(&proof, &principal.email)?)
    }

    /// Wildcard credential keyed by the principal id. Off unless configured.
    pub fn issue_legacy_stream_credential(&self, principal: &Principal) -> Result<IssuedToken<StreamingClaims>> {
        if !self.streaming.allow_legacy_broad_grant {
            return Err(Error::Disabled("legacy broad streaming grant".to_string()));
        }
        Ok(self.tokens.streaming.issue_legacy(principal.id, &principal.email)?)
    }

    pub fn legacy_grant_enabled(&self) -> bool {
        self.streaming.allow_legacy_broad_grant
    }

    pub fn stream_ttl(&self) -> Duration {
        self.tokens.streaming.device_ttl()
    }

    pub async fn device_count(&self, principal: &Principal) -> Result<i64> {
        self.principals.count_devices(principal.id).await
    }

    pub async fn create_device(&self, principal: &Principal, request: CreateDeviceRequest) -> Result<Device> {
        validate_device_name(&request.name).map_err(|e| Error::Validation(format!("name: {}", e)))?;

        let device_id = match request.device_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                validate_device_id(&id).map_err(|e| Error::Validation(format!("device_id: {}", e)))?;
                id
            }
            None => Device::generate_device_id(),
        };

        let device = self
            .devices
            .create_device(NewDevice {
                device_id,
                name: request.name.trim().to_string(),
                owner_id: principal.id,
            })
            .await?;

        tracing::info!(principal_id = principal.id, device_id = %device.device_id, "Registered device");
        Ok(device)
    }

    pub async fn list_devices(&self, principal: &Principal) -> Result<Vec<Device>> {
        self.devices.list_owned_devices(principal.id).await
    }

    pub async fn get_device(&self, principal: &Principal, id: i64) -> Result<Device> {
        self.devices
            .find_owned_device(id, principal.id)
            .await?
            .ok_or_else(|| Error::DeviceNotFound(id.to_string()))
    }

    /// Returns the removed device.
    pub async fn delete_device(&self, principal: &Principal, id: i64) -> Result<Device> {
        let device = self.get_device(principal, id).await?;
        if !self.devices.delete_owned_device(id, principal.id).await? {
            return Err(Error::DeviceNotFound(id.to_string()));
        }
        tracing::info!(principal_id = principal.id, device_id = %device.device_id, "Deleted device");
        Ok(device)
    }
}
