//! Anti-forgery tokens for the web interface.
//!
//! A token is `<timestamp hex>-<digest>`, where the digest is the
//! URL-safe, unpadded base64 of `SHA-512("<secret>-<session id>-<timestamp hex>")`.
//! Tokens are never stored: validation regenerates the token from its
//! embedded timestamp and compares the whole string.
//!
//! The comparison is an ordinary string comparison, not constant-time.
//! Timestamps in the future are not rejected.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha512};
use std::time::Duration;
use tracing::debug;

use super::secret::ServerSecret;

/// How long a token remains valid.
pub const CSRF_VALIDITY: Duration = Duration::from_secs(48 * 3600);

/// Content-Security-Policy header value served with the web interface.
pub const CONTENT_SECURITY_POLICY: &str =
    "default-src 'self' 'unsafe-inline' 'unsafe-eval'; img-src 'self' data:";

#[derive(Debug, Clone)]
pub struct CsrfTokenService {
    secret: ServerSecret,
    validity: Duration,
}

impl CsrfTokenService {
    pub fn new(secret: ServerSecret) -> Self {
        Self {
            secret,
            validity: CSRF_VALIDITY,
        }
    }

    /// Mint a token for `session_id` stamped with the current time.
    pub fn generate(&self, session_id: &str) -> String {
        self.generate_at(session_id, unix_now())
    }

    /// Mint a token for `session_id` stamped with `timestamp` (unix seconds).
    pub fn generate_at(&self, session_id: &str, timestamp: u64) -> String {
        let ts = format!("{:x}", timestamp);
        let payload = [self.secret.expose(), session_id, ts.as_str()].join("-");
        let digest = URL_SAFE_NO_PAD.encode(Sha512::digest(payload.as_bytes()));
        format!("{}-{}", ts, digest)
    }

    /// Check a token against the current time.
    pub fn validate(&self, session_id: &str, token: &str) -> bool {
        self.validate_at(session_id, token, unix_now())
    }

    /// Check a token as of `now` (unix seconds).
    ///
    /// Malformed tokens are simply invalid.
    pub fn validate_at(&self, session_id: &str, token: &str, now: u64) -> bool {
        let Some(when) = token_timestamp(token) else {
            debug!("Rejecting CSRF token with unparseable timestamp");
            return false;
        };

        let cutoff = now.saturating_sub(self.validity.as_secs());
        if when <= cutoff {
            debug!("Rejecting expired CSRF token (issued at {})", when);
            return false;
        }

        token == self.generate_at(session_id, when)
    }
}

/// Parse the hex timestamp before the first `-`.
fn token_timestamp(token: &str) -> Option<u64> {
    let (ts, _) = token.split_once('-')?;
    u64::from_str_radix(ts, 16).ok()
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: u64 = 3600;
    const NOW: u64 = 1_760_000_000;

    fn service() -> CsrfTokenService {
        CsrfTokenService::new(ServerSecret::new("server-secret-for-tests"))
    }

    #[test]
    fn token_format() {
        let token = service().generate_at("sid", 0x1a2b);
        let (ts, digest) = token.split_once('-').unwrap();
        assert_eq!(ts, "1a2b");
        // SHA-512 is 64 bytes -> 86 base64 characters without padding
        assert_eq!(digest.len(), 86);
        assert!(!digest.contains('='));
        assert!(!digest.contains('+'));
        assert!(!digest.contains('/'));
    }

    #[test]
    fn digest_matches_reference_construction() {
        let token = service().generate_at("abc", 255);
        let expected = URL_SAFE_NO_PAD.encode(Sha512::digest(b"server-secret-for-tests-abc-ff"));
        assert_eq!(token, format!("ff-{}", expected));
    }

    #[test]
    fn fresh_token_validates() {
        let svc = service();
        let token = svc.generate("session-1");
        assert!(svc.validate("session-1", &token));
    }

    #[test]
    fn expiry_window() {
        let svc = service();
        let old = svc.generate_at("sid", NOW - 49 * HOUR);
        let recent = svc.generate_at("sid", NOW - 47 * HOUR);

        assert!(!svc.validate_at("sid", &old, NOW));
        assert!(svc.validate_at("sid", &recent, NOW));
    }

    #[test]
    fn boundary_is_exclusive() {
        let svc = service();
        let edge = svc.generate_at("sid", NOW - 48 * HOUR);
        assert!(!svc.validate_at("sid", &edge, NOW));
        let inside = svc.generate_at("sid", NOW - 48 * HOUR + 1);
        assert!(svc.validate_at("sid", &inside, NOW));
    }

    #[test]
    fn future_tokens_are_accepted() {
        let svc = service();
        let future = svc.generate_at("sid", NOW + 1000 * HOUR);
        assert!(svc.validate_at("sid", &future, NOW));
    }

    #[test]
    fn tampered_digest_fails() {
        let svc = service();
        let token = svc.generate_at("sid", NOW);
        let sep = token.find('-').unwrap();

        for i in (sep + 1)..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert!(
                !svc.validate_at("sid", &tampered, NOW),
                "tamper at {} accepted",
                i
            );
        }
    }

    #[test]
    fn other_session_fails() {
        let svc = service();
        let token = svc.generate_at("alice", NOW);
        assert!(!svc.validate_at("bob", &token, NOW));
    }

    #[test]
    fn other_secret_fails() {
        let token = service().generate_at("sid", NOW);
        let other = CsrfTokenService::new(ServerSecret::new("a-different-secret"));
        assert!(!other.validate_at("sid", &token, NOW));
    }

    #[test]
    fn timestamp_prefix_must_match_verbatim() {
        let svc = service();
        let token = svc.generate_at("sid", NOW);
        let padded = format!("0{}", token);
        assert!(!svc.validate_at("sid", &padded, NOW));

        let upper = {
            let (ts, digest) = token.split_once('-').unwrap();
            format!("{}-{}", ts.to_uppercase(), digest)
        };
        assert!(!svc.validate_at("sid", &upper, NOW));
    }

    #[test]
    fn malformed_tokens_are_invalid() {
        let svc = service();
        for token in ["", "-", "nothex-abc", "abcdef", "zz-zz", "-abc"] {
            assert!(!svc.validate_at("sid", token, NOW), "{:?} accepted", token);
        }
    }

    #[test]
    fn csp_literal() {
        assert_eq!(
            CONTENT_SECURITY_POLICY,
            "default-src 'self' 'unsafe-inline' 'unsafe-eval'; img-src 'self' data:"
        );
    }
}
