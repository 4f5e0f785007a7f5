//! Argon2id password hashing in PHC string format.

use crate::config::HashCost;
use crate::error::AppError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: HashCost,
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Self {
        PasswordHasher { cost }
    }

    fn argon2(&self) -> Result<Argon2<'static>, AppError> {
        let params = Params::new(self.cost.memory_kib, self.cost.iterations, 1, None)
            .map_err(|e| AppError::Internal(format!("argon2 params: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(e.to_string()))?
            .to_string())
    }

    /// Check `password` against a stored PHC string. The cost stored in the
    /// string wins over the configured one.
    pub fn verify(&self, password: &str, phc: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(phc).map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(self.argon2()?.verify_password(password.as_bytes(), &parsed).is_ok())
    }

    /// `hash` on the blocking pool.
    pub async fn hash_blocking(&self, password: String) -> Result<String, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// `verify` on the blocking pool.
    pub async fn verify_blocking(&self, password: String, phc: String) -> Result<bool, AppError> {
        let hasher = *self;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &phc))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifiable() {
        let hasher = PasswordHasher::new(HashCost::cheap());
        let a = hasher.hash("correct horse").unwrap();
        let b = hasher.hash("correct horse").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(!a.contains("correct horse"));
        assert!(hasher.verify("correct horse", &a).unwrap());
        assert!(!hasher.verify("battery staple", &a).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        let hasher = PasswordHasher::new(HashCost::cheap());
        assert!(hasher.verify("x", "plaintext").is_err());
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let hasher = PasswordHasher::new(HashCost::cheap());
        let phc = hasher.hash_blocking("s3cret-pass".into()).await.unwrap();
        assert!(hasher.verify_blocking("s3cret-pass".into(), phc).await.unwrap());
    }
}
