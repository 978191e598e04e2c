//! Claim sets carried inside signed tokens
//!
//! Two kinds of token share one signing secret and are told apart by the
//! `type` claim: `"access"` for session identity and `"websocket"` for
//! streaming credentials handed to the messaging layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role asserted in an access token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Websocket,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Websocket => f.write_str("websocket"),
        }
    }
}

/// "This bearer IS principal `sub`" until `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(with = "principal_id_string")]
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

impl AccessClaims {
    pub fn principal_id(&self) -> i64 {
        self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// What a streaming credential was granted for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamScope {
    /// Bound to one registered device the principal was proven to own.
    DeviceScoped { device_id: String },
    /// Wildcard grant over every topic keyed by the principal id.
    LegacyBroad,
}

impl StreamScope {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            StreamScope::DeviceScoped { device_id } => Some(device_id),
            StreamScope::LegacyBroad => None,
        }
    }
}

/// "This bearer MAY subscribe/publish only to these topic patterns" until `exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StreamingClaimsWire", from = "StreamingClaimsWire")]
pub struct StreamingClaims {
    pub email: String,
    pub user_id: i64,
    pub scope: StreamScope,
    pub subscribe_topics: Vec<String>,
    pub publish_topics: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Flat JSON layout understood by brokers.
#[derive(Serialize, Deserialize)]
struct StreamingClaimsWire {
    sub: String,
    iat: u64,
    exp: u64,
    subs: Vec<String>,
    publ: Vec<String>,
    user_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
}

impl From<StreamingClaims> for StreamingClaimsWire {
    fn from(claims: StreamingClaims) -> Self {
        let device_id = match claims.scope {
            StreamScope::DeviceScoped { device_id } => Some(device_id),
            StreamScope::LegacyBroad => None,
        };
        Self {
            sub: claims.email,
            iat: claims.iat,
            exp: claims.exp,
            subs: claims.subscribe_topics,
            publ: claims.publish_topics,
            user_id: claims.user_id,
            device_id,
        }
    }
}

impl From<StreamingClaimsWire> for StreamingClaims {
    fn from(wire: StreamingClaimsWire) -> Self {
        let scope = match wire.device_id {
            Some(device_id) => StreamScope::DeviceScoped { device_id },
            None => StreamScope::LegacyBroad,
        };
        Self {
            email: wire.sub,
            user_id: wire.user_id,
            scope,
            subscribe_topics: wire.subs,
            publish_topics: wire.publ,
            iat: wire.iat,
            exp: wire.exp,
        }
    }
}

/// Any claim set this service signs, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenClaims {
    #[serde(rename = "access")]
    Access(AccessClaims),
    #[serde(rename = "websocket")]
    Streaming(StreamingClaims),
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenClaims::Access(_) => TokenKind::Access,
            TokenClaims::Streaming(_) => TokenKind::Websocket,
        }
    }

    pub fn issued_at(&self) -> u64 {
        match self {
            TokenClaims::Access(c) => c.iat,
            TokenClaims::Streaming(c) => c.iat,
        }
    }

    pub fn expires_at(&self) -> u64 {
        match self {
            TokenClaims::Access(c) => c.exp,
            TokenClaims::Streaming(c) => c.exp,
        }
    }
}

impl From<AccessClaims> for TokenClaims {
    fn from(claims: AccessClaims) -> Self {
        TokenClaims::Access(claims)
    }
}

impl From<StreamingClaims> for TokenClaims {
    fn from(claims: StreamingClaims) -> Self {
        TokenClaims::Streaming(claims)
    }
}

/// `sub` travels as a decimal string.
mod principal_id_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_access_wire_layout() {
        let claims = TokenClaims::Access(AccessClaims {
            sub: 42,
            email: "user@example.com".to_string(),
            role: Role::User,
            iat: 1_000,
            exp: 2_800,
        });

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "access",
                "sub": "42",
                "email": "user@example.com",
                "role": "user",
                "iat": 1_000,
                "exp": 2_800,
            })
        );
    }

    #[test]
    fn test_device_scoped_wire_layout() {
        let claims = TokenClaims::Streaming(StreamingClaims {
            email: "user@example.com".to_string(),
            user_id: 7,
            scope: StreamScope::DeviceScoped { device_id: "dev_abc123".to_string() },
            subscribe_topics: vec!["devices/dev_abc123".to_string()],
            publish_topics: vec![],
            iat: 10,
            exp: 86_410,
        });

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "websocket",
                "sub": "user@example.com",
                "iat": 10,
                "exp": 86_410,
                "subs": ["devices/dev_abc123"],
                "publ": [],
                "user_id": 7,
                "device_id": "dev_abc123",
            })
        );
    }

    #[test]
    fn test_missing_device_id_reads_as_legacy() {
        let value = json!({
            "type": "websocket",
            "sub": "user@example.com",
            "iat": 10,
            "exp": 3_610,
            "subs": ["devices/7/#", "user/7/data", "user/7/status"],
            "publ": ["devices/7/commands"],
            "user_id": 7,
        });

        let claims: TokenClaims = serde_json::from_value(value).unwrap();
        match claims {
            TokenClaims::Streaming(s) => {
                assert_eq!(s.scope, StreamScope::LegacyBroad);
                assert_eq!(s.publish_topics, vec!["devices/7/commands"]);
            }
            other => panic!("expected streaming claims, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let value = json!({ "type": "refresh", "sub": "1", "iat": 0, "exp": 1 });
        assert!(serde_json::from_value::<TokenClaims>(value).is_err());
    }

    #[test]
    fn test_non_numeric_subject_is_rejected() {
        let value = json!({
            "type": "access", "sub": "alice", "email": "a@b.c", "role": "user", "iat": 0, "exp": 1,
        });
        assert!(serde_json::from_value::<TokenClaims>(value).is_err());
    }

    #[test]
    fn test_role_from_admin_flag() {
        assert_eq!(Role::from_admin_flag(false), Role::User);
        assert_eq!(Role::from_admin_flag(true), Role::Admin);
        assert_eq!(Role::default().to_string(), "user");
    }
}
