//! Converts bearer tokens into authorization decisions

use crate::claims::{AccessClaims, StreamScope, TokenClaims, TokenKind};
use crate::codec::TokenCodec;
use crate::error::{AuthError, Result};

/// Topic permissions recovered from a streaming credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingPermission {
    pub user_id: i64,
    pub email: String,
    pub scope: StreamScope,
    pub subscribe_topics: Vec<String>,
    pub publish_topics: Vec<String>,
    pub expires_at: u64,
}

impl StreamingPermission {
    pub fn device_id(&self) -> Option<&str> {
        self.scope.device_id()
    }

    /// Exact match only; wildcard semantics belong to the broker.
    pub fn can_subscribe(&self, topic: &str) -> bool {
        self.subscribe_topics.iter().any(|t| t == topic)
    }

    pub fn can_publish(&self, topic: &str) -> bool {
        self.publish_topics.iter().any(|t| t == topic)
    }
}

/// Single entry point for validating access tokens and streaming credentials.
///
/// The `authorize_*` methods keep the failure reason; the `verify_*` methods
/// log it at debug level and collapse it into `None`.
#[derive(Debug, Clone)]
pub struct TokenGuard {
    codec: TokenCodec,
}

impl TokenGuard {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn authorize_access(&self, token: &str) -> Result<AccessClaims> {
        match self.codec.decode(token)? {
            TokenClaims::Access(claims) => Ok(claims),
            other => Err(AuthError::WrongKind {
                expected: TokenKind::Access,
                found: other.kind(),
            }),
        }
    }

    pub fn authorize_stream(&self, token: &str) -> Result<StreamingPermission> {
        match self.codec.decode(token)? {
            TokenClaims::Streaming(claims) => Ok(StreamingPermission {
                user_id: claims.user_id,
                email: claims.email,
                scope: claims.scope,
                subscribe_topics: claims.subscribe_topics,
                publish_topics: claims.publish_topics,
                expires_at: claims.exp,
            }),
            other => Err(AuthError::WrongKind {
                expected: TokenKind::Websocket,
                found: other.kind(),
            }),
        }
    }

    pub fn verify_access(&self, token: &str) -> Option<AccessClaims> {
        self.authorize_access(token)
            .map_err(|e| tracing::debug!(reason = e.label(), "Access token rejected: {}", e))
            .ok()
    }

    pub fn verify_stream(&self, token: &str) -> Option<StreamingPermission> {
        self.authorize_stream(token)
            .map_err(|e| tracing::debug!(reason = e.label(), "Streaming credential rejected: {}", e))
            .ok()
    }
}

/// Extract the credential from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
