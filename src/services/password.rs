use crate::errors::{AppError, AppResult};

/// bcrypt hasher. The salt is generated per call and embedded in the digest.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> AppResult<String> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// A digest that cannot be parsed never matches.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        match bcrypt::verify(plaintext, digest) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("Stored password digest could not be verified: {}", e);
                false
            }
        }
    }

    // bcrypt is CPU bound, keep it off the async worker threads
    pub async fn hash_blocking(&self, plaintext: String) -> AppResult<String> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
    }

    pub async fn verify_blocking(&self, plaintext: String, digest: String) -> AppResult<bool> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
    }
}
