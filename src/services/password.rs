//! Password hashing
//!
//! Argon2id with a fresh random salt per hash. The work factor comes from
//! [`PasswordConfig`] and is written into the PHC string next to the salt and
//! digest, so verification always uses the parameters a hash was created
//! with and raising the cost never locks out existing accounts.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordConfig;

fn hasher(config: &PasswordConfig) -> Result<Argon2<'static>> {
    let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 parameters: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password, returning a PHC string such as `$argon2id$v=19$m=...`.
///
/// The plaintext is never logged or stored.
pub fn hash_password(password: &str, config: &PasswordConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = hasher(config)?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// Cheap parameters so tests don't spend seconds hashing.
#[cfg(test)]
pub(crate) fn test_config() -> PasswordConfig {
    PasswordConfig {
        memory_kib: 256,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_produces_argon2id_hash() {
        let hash = hash_password("secret1", &test_config()).expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$v=19$"), "Hash should use Argon2id");
        assert!(hash.contains("m=256,t=1,p=1"));
    }

    #[test]
    fn test_hash_password_produces_different_hashes() {
        let config = test_config();
        let hash1 = hash_password("same_password", &config).unwrap();
        let hash2 = hash_password("same_password", &config).unwrap();

        assert_ne!(hash1, hash2, "Random salt should make every hash unique");
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("secret1", &test_config()).unwrap();

        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("wrongpass", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("password", "invalid_hash_format");
        assert!(result.is_err(), "Invalid hash format should return error");
    }

    #[test]
    fn test_changing_work_factor_keeps_old_hashes_valid() {
        let old = hash_password("secret1", &test_config()).unwrap();

        let stronger = PasswordConfig {
            memory_kib: 512,
            iterations: 2,
            parallelism: 1,
        };
        let new = hash_password("secret1", &stronger).unwrap();
        assert!(new.contains("m=512,t=2,p=1"));

        assert!(verify_password("secret1", &old).unwrap());
        assert!(verify_password("secret1", &new).unwrap());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let config = PasswordConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(hash_password("secret1", &config).is_err());
    }

    #[test]
    fn test_hash_password_unicode() {
        let password = "şifre-güçlü-🔐";
        let hash = hash_password(password, &test_config()).unwrap();
        assert!(verify_password(password, &hash).unwrap());
    }

    #[test]
    fn test_password_hash_not_equal_to_password() {
        let password = "my_secret_password";
        let hash = hash_password(password, &test_config()).unwrap();
        assert!(!hash.contains(password));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn hash_then_verify_accepts_only_the_original(
            password in "\\PC{0,32}",
            other in "\\PC{0,32}",
        ) {
            let hash = hash_password(&password, &test_config()).unwrap();
            prop_assert!(verify_password(&password, &hash).unwrap());
            if other != password {
                prop_assert!(!verify_password(&other, &hash).unwrap());
            }
        }
    }
}
