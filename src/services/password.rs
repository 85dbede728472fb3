use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

#[derive(thiserror::Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hashes a password into a PHC string (Argon2id, random salt)
pub fn hash_password_sync(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Checks a password against a stored PHC string. Malformed hashes never match.
pub fn verify_password_sync(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Hashes on the blocking pool so request workers are not stalled
pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_sync(&password)).await?
}

pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, PasswordError> {
    let matches =
        tokio::task::spawn_blocking(move || verify_password_sync(&password, &stored_hash)).await?;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password_sync("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password_sync("correct horse", &hash));
        assert!(!verify_password_sync("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password_sync("same-password").unwrap();
        let second = hash_password_sync("same-password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_does_not_match() {
        assert!(!verify_password_sync("anything", "not-a-phc-string"));
        assert!(!verify_password_sync("anything", ""));
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hash = hash_password("secret1".to_string()).await.unwrap();
        assert!(verify_password("secret1".to_string(), hash).await.unwrap());
    }
}
