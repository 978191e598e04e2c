//! Signed token encoding and decoding

use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::TokenClaims;
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, Result};
use crate::secret::SigningSecret;

/// The only algorithm this codec signs with or accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Encodes claim sets into compact HS256 tokens and back.
///
/// Decoding verifies the header algorithm and the signature before any claim
/// is looked at; expiry is then checked against the injected [`Clock`].
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    header: Header,
    validation: Arc<Validation>,
    leeway_seconds: u64,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &SigningSecret, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        // Expiry is enforced below against our own clock.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            header: Header::new(SIGNING_ALGORITHM),
            validation: Arc::new(validation),
            leeway_seconds: 0,
            clock,
        }
    }

    /// Tolerate `exp` being up to `seconds` in the past.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> u64 {
        self.clock.unix_seconds()
    }

    pub fn encode(&self, claims: &TokenClaims) -> Result<String> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| AuthError::EncodingError(e.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if self.now() > claims.expires_at().saturating_add(self.leeway_seconds) {
            return Err(AuthError::ExpiredSignature);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{AccessClaims, Role};
    use crate::clock::ManualClock;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use chrono::Duration;

    fn secret() -> SigningSecret {
        SigningSecret::from_bytes(b"0123456789abcdef0123456789abcdef".to_vec()).unwrap()
    }

    fn access(iat: u64, exp: u64) -> TokenClaims {
        TokenClaims::Access(AccessClaims {
            sub: 1,
            email: "a@example.com".to_string(),
            role: Role::User,
            iat,
            exp,
        })
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let codec = TokenCodec::new(&secret());
        let claims = access(100, 200);
        assert_eq!(codec.encode(&claims).unwrap(), codec.encode(&claims).unwrap());
    }

    #[test]
    fn test_header_names_hs256() {
        let codec = TokenCodec::new(&secret());
        let token = codec.encode(&access(100, 200)).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = ManualClock::at_unix(1_000);
        let codec = TokenCodec::with_clock(&secret(), Arc::new(clock.clone()));
        let token = codec.encode(&access(1_000, 1_010)).unwrap();

        clock.advance(Duration::seconds(10));
        assert!(codec.decode(&token).is_ok(), "now == exp is still valid");

        clock.advance(Duration::seconds(1));
        assert!(matches!(codec.decode(&token), Err(AuthError::ExpiredSignature)));
    }

    #[test]
    fn test_leeway_extends_validity() {
        let clock = ManualClock::at_unix(1_020);
        let codec = TokenCodec::with_clock(&secret(), Arc::new(clock)).with_leeway(30);
        let token = codec.encode(&access(1_000, 1_010)).unwrap();
        assert!(codec.decode(&token).is_ok());
    }

    #[test]
    fn test_rejects_substituted_algorithm() {
        let codec = TokenCodec::new(&secret());
        let now = codec.now();
        let forged = encode(
            &Header::new(Algorithm::HS512),
            &access(now, now + 60),
            &EncodingKey::from_secret(secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec.decode(&forged), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_unsigned_token() {
        let codec = TokenCodec::new(&secret());
        let now = codec.now();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&access(now, now + 60)).unwrap());
        let unsigned = format!("{}.{}.", header, body);

        assert!(matches!(codec.decode(&unsigned), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_rejects_truncated_token() {
        let codec = TokenCodec::new(&secret());
        let now = codec.now();
        let token = codec.encode(&access(now, now + 60)).unwrap();
        let truncated = &token[..token.rfind('.').unwrap()];

        assert!(matches!(codec.decode(truncated), Err(AuthError::InvalidToken(_))));
        assert!(matches!(codec.decode(""), Err(AuthError::InvalidToken(_))));
    }
}
