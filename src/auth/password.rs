use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config;

/// Hashes passwords for storage and checks candidates against stored hashes.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> String;

    fn verify(&self, password: &str, hashed: &str) -> bool;
}

/// Salted, iterated SHA-256 stored as `sha256$<rounds>$<salt>$<hex digest>`.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Hasher {
    rounds: u32,
}

impl Sha256Hasher {
    pub const fn new(rounds: u32) -> Self {
        Self {
            rounds: if rounds == 0 { 1 } else { rounds },
        }
    }

    /// Work factor from `SECURITY_PASSWORD_HASH_ROUNDS`.
    pub fn from_config() -> Self {
        Self::new(config::config().security.password_hash_rounds)
    }
}

impl PasswordHasher for Sha256Hasher {
    fn hash(&self, password: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        format!("sha256${}${}${}", self.rounds, salt, stretch(password, &salt, self.rounds))
    }

    fn verify(&self, password: &str, hashed: &str) -> bool {
        let mut parts = hashed.splitn(4, '$');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("sha256"), Some(rounds), Some(salt), Some(expected)) => rounds
                .parse::<u32>()
                .map_or(false, |rounds| {
                    constant_time_eq(stretch(password, salt, rounds).as_bytes(), expected.as_bytes())
                }),
            _ => false,
        }
    }
}

fn stretch(password: &str, salt: &str, rounds: u32) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();
    for _ in 1..rounds {
        digest = Sha256::new().chain_update(digest).chain_update(password.as_bytes()).finalize();
    }
    format!("{:x}", digest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_the_original_password_only() {
        let hasher = Sha256Hasher::new(10);
        let hashed = hasher.hash("password1");

        assert!(hashed.starts_with("sha256$10$"));
        assert!(hasher.verify("password1", &hashed));
        assert!(!hasher.verify("password2", &hashed));
    }

    #[test]
    fn salts_every_hash() {
        let hasher = Sha256Hasher::new(1);
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn rounds_are_read_from_the_stored_hash() {
        let hashed = Sha256Hasher::new(3).hash("secret");
        assert!(Sha256Hasher::new(500).verify("secret", &hashed));
    }

    #[test]
    fn malformed_hashes_never_match() {
        let hasher = Sha256Hasher::new(1);
        for stored in ["", "secret", "sha256$x$salt$abc", "md5$1$salt$abc"] {
            assert!(!hasher.verify("secret", stored), "{} should not verify", stored);
        }
    }
}
