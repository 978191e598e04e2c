//! Error types for token issuance and verification

use thiserror::Error;

use crate::claims::TokenKind;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Signature is valid but `exp` lies in the past.
    #[error("Token signature has expired")]
    ExpiredSignature,

    /// Bad signature, malformed structure, wrong algorithm or any other decode failure.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token decoded fine but was minted for a different purpose.
    #[error("Wrong token kind: expected {expected}, found {found}")]
    WrongKind { expected: TokenKind, found: TokenKind },

    #[error("Device {device_id} is not owned by the caller")]
    OwnershipDenied { device_id: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token encoding failed: {0}")]
    EncodingError(String),
}

impl AuthError {
    /// Stable label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            AuthError::ExpiredSignature => "expired_signature",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::WrongKind { .. } => "wrong_kind",
            AuthError::OwnershipDenied { .. } => "ownership_denied",
            AuthError::ConfigError(_) => "config",
            AuthError::EncodingError(_) => "encoding",
        }
    }

    /// True for failures a bearer can cause by presenting a bad credential.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::ExpiredSignature | AuthError::InvalidToken(_) | AuthError::WrongKind { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::ExpiredSignature,
            _ => AuthError::InvalidToken(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    #[test]
    fn test_jwt_error_mapping() {
        let expired: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::ExpiredSignature).into();
        assert!(matches!(expired, AuthError::ExpiredSignature));

        let bad_sig: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidSignature).into();
        assert!(matches!(bad_sig, AuthError::InvalidToken(_)));

        let bad_alg: AuthError = jsonwebtoken::errors::Error::from(ErrorKind::InvalidAlgorithm).into();
        assert!(matches!(bad_alg, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_rejection_classification() {
        assert!(AuthError::ExpiredSignature.is_rejection());
        assert!(AuthError::WrongKind { expected: TokenKind::Access, found: TokenKind::Websocket }.is_rejection());
        assert!(!AuthError::OwnershipDenied { device_id: "d".into() }.is_rejection());
        assert_eq!(AuthError::InvalidToken("x".into()).label(), "invalid_token");
    }
}
