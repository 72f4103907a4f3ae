//! Unsubscribe token generation.
//!
//! Tokens are an HMAC-SHA256 digest of the lower-cased email address under a
//! shared secret, hex-encoded. They are deterministic: the same email always
//! yields the same token, so a token is never stored as independent
//! randomness and can always be recomputed for verification. Rotating the
//! secret invalidates every previously issued token; that is the intended
//! mass-revocation mechanism.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct TokenGenerator {
    secret: String,
}

impl TokenGenerator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Hex-encoded HMAC-SHA256 of the lower-cased email. Always 64 chars.
    pub fn token(&self, email: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take a key of any size");
        mac.update(email.trim().to_lowercase().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute and compare.
    pub fn verify(&self, email: &str, token: &str) -> bool {
        self.token(email) == token
    }
}
