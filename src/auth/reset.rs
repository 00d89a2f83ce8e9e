use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_BYTES: usize = 20;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// A freshly minted reset token. Only `hash` is persisted; `token` goes out by email.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        Self {
            hash: hash_token(&token),
            token,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

/// Hex SHA-256 of the token as stored in the user record.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
