//! # rn-auth-simple
//!
//! SHA-256 based implementation of `IdentityResolver`.
//! A user token is `<user_id>.<hex digest>` where the digest covers the
//! server secret and the user id. Issuing tokens belongs to the login
//! service; this plugin only verifies them.

use async_trait::async_trait;
use rn_core::models::ActingUser;
use rn_core::traits::IdentityResolver;
use sha2::{Digest, Sha256};

pub struct SimpleIdentityResolver {
    /// Shared with the service that issues tokens
    secret: String,
}

impl SimpleIdentityResolver {
    /// Accepts a secret string (e.g., from an environment variable)
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    fn digest(&self, user_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(b".");
        hasher.update(user_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Produces the token the resolver accepts for `user_id`.
    pub fn sign(&self, user_id: &str) -> String {
        format!("{user_id}.{}", self.digest(user_id))
    }

    /// Returns the user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Option<String> {
        let (user_id, signature) = token.rsplit_once('.')?;
        if user_id.is_empty() {
            return None;
        }

        let expected = self.digest(user_id);
        // Compare every byte so timing does not leak the matching prefix.
        let matches = expected.len() == signature.len()
            && expected
                .bytes()
                .zip(signature.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0;

        matches.then(|| user_id.to_string())
    }
}

#[async_trait]
impl IdentityResolver for SimpleIdentityResolver {
    /// Missing or forged tokens resolve to a signed-out user.
    async fn resolve(&self, credentials: Option<&str>) -> anyhow::Result<ActingUser> {
        let Some(token) = credentials.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(ActingUser::anonymous());
        };

        match self.verify(token) {
            Some(user_id) => Ok(ActingUser::signed_in(user_id)),
            None => {
                log::debug!("rejected user token");
                Ok(ActingUser::anonymous())
            }
        }
    }
}
