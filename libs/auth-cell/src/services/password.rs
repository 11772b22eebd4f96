// libs/auth-cell/src/services/password.rs
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use tracing::instrument;

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    #[instrument(skip(password, hash))]
    pub fn verify_password(
        password: &str,
        hash: &str,
    ) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;
        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = PasswordService::hash_password("sup3r-secret").unwrap();
        assert_ne!(hash, "sup3r-secret");
        assert!(PasswordService::verify_password("sup3r-secret", &hash).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let hash = PasswordService::hash_password("sup3r-secret").unwrap();
        assert!(!PasswordService::verify_password("other-secret", &hash).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let first = PasswordService::hash_password("sup3r-secret").unwrap();
        let second = PasswordService::hash_password("sup3r-secret").unwrap();
        assert_ne!(first, second);
    }
}
