use crate::application_port::{CredentialHasher, SessionError};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Argon2id with a fresh random salt per hash; output is a PHC string so
/// verification needs no shared state.
pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, SessionError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| SessionError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, SessionError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| SessionError::InternalError(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(SessionError::InternalError(format!("verify error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_embeds_a_fresh_salt_each_call() {
        let hasher = Argon2PasswordHasher;
        let a = hasher.hash_password("secret1").await.unwrap();
        let b = hasher.hash_password("secret1").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn verify_accepts_the_right_password_only() {
        let hasher = Argon2PasswordHasher;
        let hash = hasher.hash_password("secret1").await.unwrap();
        assert!(hasher.verify_password("secret1", &hash).await.unwrap());
        assert!(!hasher.verify_password("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn verify_rejects_garbage_hashes() {
        let hasher = Argon2PasswordHasher;
        assert!(hasher.verify_password("secret1", "not-a-phc-string").await.is_err());
    }
}
