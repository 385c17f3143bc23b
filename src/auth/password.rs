use sha2::{Digest, Sha256};

/// Salted-digest password hashing: `hex(sha256(password || salt))`.
///
/// The salt is process-wide, not per-user, so identical passwords hash
/// identically across accounts. This preserves the on-disk format of the
/// existing user base and is a documented limitation of that format.
#[derive(Clone)]
pub struct PasswordHasher {
    salt: String,
}

impl PasswordHasher {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(self.salt.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(&self, password: &str, hash: &str) -> bool {
        self.hash(password) == hash
    }
}
