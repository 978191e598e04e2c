//! # Auth-Core - Credential issuance and verification for IOTP
//!
//! This crate holds the token model shared by the user service and the
//! messaging layer:
//! - [`TokenCodec`]: HS256 signing and verification of claim sets
//! - [`AccessTokenIssuer`]: short-lived identity tokens (`type = "access"`)
//! - [`StreamingCredentialIssuer`]: topic grants for brokers (`type = "websocket"`)
//! - [`TokenGuard`]: turns a bearer token into an identity or a permission set
//!
//! Tokens are self-contained. There is no session table and no revocation
//! list: a leaked or logged-out token stays valid until its `exp`. The only
//! shared state is the immutable [`SigningSecret`] each instance is built with.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod error;
pub mod guard;
pub mod issuer;
pub mod secret;

pub use claims::{AccessClaims, Role, StreamScope, StreamingClaims, TokenClaims, TokenKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{TokenCodec, SIGNING_ALGORITHM};
pub use error::{AuthError, Result};
pub use guard::{bearer_token, StreamingPermission, TokenGuard};
pub use issuer::{
    AccessTokenIssuer, IssuedToken, OwnershipProof, StreamingCredentialIssuer, DEFAULT_ACCESS_TTL,
    DEFAULT_LEGACY_STREAM_TTL, DEFAULT_STREAM_TTL,
};
pub use secret::SigningSecret;
