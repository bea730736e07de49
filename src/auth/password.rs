use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::config::HashConfig;

/// Salted one-way password hashing (Argon2id, PHC string output).
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cfg: &HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Parameters embedded in `hash` take precedence over the configured ones,
    /// so hashes made under an older work factor still verify.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };
        self.argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(&AppConfig::for_tests().hash).expect("test params are valid")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let h = hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = h.hash(password).expect("hashing should succeed");
        assert!(h.verify(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let h = hasher();
        let hash = h.hash("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!h.verify("wrong-password", &hash));
    }

    #[test]
    fn verify_is_false_on_malformed_hash() {
        assert!(!hasher().verify("anything", "not-a-valid-hash"));
        assert!(!hasher().verify("anything", ""));
    }

    #[test]
    fn same_password_hashes_differently() {
        let h = hasher();
        let a = h.hash("Abcdef1!").unwrap();
        let b = h.hash("Abcdef1!").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("Abcdef1!"));
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn hash_from_other_params_still_verifies() {
        let old = PasswordHasher::new(&HashConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = old.hash("Abcdef1!").unwrap();
        assert!(hasher().verify("Abcdef1!", &hash));
    }

    #[test]
    fn rejects_invalid_params() {
        let cfg = HashConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(PasswordHasher::new(&cfg).is_err());
    }
}
