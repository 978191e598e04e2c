//! Behavioural tests for the token model: round trips, expiry, tampering,
//! secret isolation and kind discrimination.

use std::sync::Arc;

use chrono::Duration;
use iotp_auth_core::{
    AccessTokenIssuer, AuthError, ManualClock, OwnershipProof, Role, SigningSecret, StreamScope,
    StreamingCredentialIssuer, TokenClaims, TokenCodec, TokenGuard, TokenKind,
};

const START: i64 = 1_700_000_000;

struct Harness {
    clock: ManualClock,
    access: AccessTokenIssuer,
    streaming: StreamingCredentialIssuer,
    guard: TokenGuard,
    codec: TokenCodec,
}

fn harness(secret: &[u8]) -> Harness {
    let clock = ManualClock::at_unix(START);
    let secret = SigningSecret::from_bytes(secret.to_vec()).unwrap();
    let codec = TokenCodec::with_clock(&secret, Arc::new(clock.clone()));

    Harness {
        clock,
        access: AccessTokenIssuer::new(codec.clone()),
        streaming: StreamingCredentialIssuer::new(codec.clone()),
        guard: TokenGuard::new(codec.clone()),
        codec,
    }
}

fn default_harness() -> Harness {
    harness(b"test-secret-test-secret-test-sec")
}

#[test]
fn access_token_round_trips_then_expires() {
    let h = default_harness();
    let cases = [
        (1_i64, "user@example.com", Role::User),
        (42, "admin@example.com", Role::Admin),
        (9_000_000_000, "big.id@example.org", Role::User),
    ];

    for (id, email, role) in cases {
        let issued = h.access.issue(id, email, role).unwrap();

        let decoded = h.codec.decode(&issued.token).unwrap();
        assert_eq!(decoded, TokenClaims::Access(issued.claims.clone()));

        let claims = h.guard.verify_access(&issued.token).expect("fresh token verifies");
        assert_eq!(claims.principal_id(), id);
        assert_eq!(claims.email, email);
        assert_eq!(claims.role, role);
        assert_eq!(claims.exp, claims.iat + 1_800);
    }

    let issued = h.access.issue(1, "user@example.com", Role::User).unwrap();
    h.clock.advance(Duration::seconds(1_801));
    assert!(matches!(h.codec.decode(&issued.token), Err(AuthError::ExpiredSignature)));
    assert!(matches!(h.guard.authorize_access(&issued.token), Err(AuthError::ExpiredSignature)));
    assert!(h.guard.verify_access(&issued.token).is_none());
}

#[test]
fn any_tampered_body_byte_is_invalid() {
    let h = default_harness();
    let token = h.access.issue(5, "user@example.com", Role::User).unwrap().token;
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let body = parts[1].as_bytes();
    for i in 0..body.len() {
        let mut tampered_body = body.to_vec();
        tampered_body[i] = if body[i] == b'A' { b'B' } else { b'A' };
        let tampered = format!(
            "{}.{}.{}",
            parts[0],
            String::from_utf8(tampered_body).unwrap(),
            parts[2]
        );

        assert!(
            matches!(h.codec.decode(&tampered), Err(AuthError::InvalidToken(_))),
            "tampering byte {} was not detected",
            i
        );
    }
}

#[test]
fn foreign_secret_never_decodes() {
    let ours = default_harness();
    let theirs = harness(b"a-completely-different-secret!!!");

    let access = theirs.access.issue(1, "user@example.com", Role::Admin).unwrap().token;
    let proof = OwnershipProof::confirm(1, "dev_1", 1).unwrap();
    let stream = theirs.streaming.issue(&proof, "user@example.com").unwrap().token;

    for token in [&access, &stream] {
        assert!(matches!(ours.codec.decode(token), Err(AuthError::InvalidToken(_))));
    }
    assert!(ours.guard.verify_access(&access).is_none());
    assert!(ours.guard.verify_stream(&stream).is_none());
}

#[test]
fn guard_discriminates_token_kind() {
    let h = default_harness();
    let access = h.access.issue(1, "user@example.com", Role::User).unwrap().token;
    let proof = OwnershipProof::confirm(1, "dev_1", 1).unwrap();
    let stream = h.streaming.issue(&proof, "user@example.com").unwrap().token;

    assert!(h.guard.verify_access(&stream).is_none());
    assert!(h.guard.verify_stream(&access).is_none());

    match h.guard.authorize_access(&stream) {
        Err(AuthError::WrongKind { expected, found }) => {
            assert_eq!(expected, TokenKind::Access);
            assert_eq!(found, TokenKind::Websocket);
        }
        other => panic!("expected WrongKind, got {:?}", other),
    }
    assert!(matches!(
        h.guard.authorize_stream(&access),
        Err(AuthError::WrongKind { expected: TokenKind::Websocket, found: TokenKind::Access })
    ));
}

#[test]
fn device_change_only_changes_topic() {
    let h = default_harness();
    let proof_a = OwnershipProof::confirm(3, "dev_a", 3).unwrap();
    let proof_b = OwnershipProof::confirm(3, "dev_b", 3).unwrap();

    let a = h.streaming.issue(&proof_a, "user@example.com").unwrap().claims;
    let b = h.streaming.issue(&proof_b, "user@example.com").unwrap().claims;

    assert_eq!(a.subscribe_topics, vec!["devices/dev_a"]);
    assert_eq!(b.subscribe_topics, vec!["devices/dev_b"]);
    assert!(a.publish_topics.is_empty() && b.publish_topics.is_empty());
    assert_eq!((a.iat, a.exp, a.user_id, &a.email), (b.iat, b.exp, b.user_id, &b.email));
}

#[test]
fn streaming_permission_reflects_claims() {
    let h = default_harness();
    let proof = OwnershipProof::confirm(11, "dev_abc123", 11).unwrap();
    let issued = h.streaming.issue(&proof, "user@example.com").unwrap();

    let permission = h.guard.verify_stream(&issued.token).expect("credential verifies");
    assert_eq!(permission.user_id, 11);
    assert_eq!(permission.email, "user@example.com");
    assert_eq!(permission.subscribe_topics, vec!["devices/dev_abc123"]);
    assert!(permission.publish_topics.is_empty());
    assert_eq!(permission.expires_at, START as u64 + 86_400);
    assert_eq!(permission.scope, StreamScope::DeviceScoped { device_id: "dev_abc123".to_string() });

    h.clock.advance(Duration::seconds(86_401));
    assert!(matches!(h.guard.authorize_stream(&issued.token), Err(AuthError::ExpiredSignature)));
}
