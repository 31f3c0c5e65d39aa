//! Authentication gateway.
//!
//! The controller never sees a plaintext secret and never compares one; it
//! delegates to a `CredentialVerifier`. The production verifier holds a
//! SHA-256 digest loaded from the daemon configuration.

use sha2::{Digest, Sha256};

/// Verifies an administrator credential before any mutating operation.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> bool;
}

/// Verifier backed by a hex-encoded SHA-256 digest.
///
/// An empty digest rejects everything, so an unconfigured daemon accepts no
/// mutating calls.
pub struct DigestVerifier {
    digest_hex: String,
}

impl DigestVerifier {
    pub fn new(digest_hex: impl Into<String>) -> Self {
        Self {
            digest_hex: digest_hex.into().to_lowercase(),
        }
    }

    /// Hex digest for a plaintext credential. Used by installers and tests
    /// to produce the configured value.
    pub fn digest_of(credential: &str) -> String {
        hex::encode(Sha256::digest(credential.as_bytes()))
    }
}

impl CredentialVerifier for DigestVerifier {
    fn verify(&self, credential: &str) -> bool {
        if self.digest_hex.is_empty() {
            return false;
        }
        Self::digest_of(credential) == self.digest_hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_accepts_matching_credential() {
        let verifier = DigestVerifier::new(DigestVerifier::digest_of("override-2024"));
        assert!(verifier.verify("override-2024"));
    }

    #[test]
    fn test_verify_rejects_wrong_credential() {
        let verifier = DigestVerifier::new(DigestVerifier::digest_of("override-2024"));
        assert!(!verifier.verify("guess"));
        assert!(!verifier.verify(""));
    }

    #[test]
    fn test_unconfigured_verifier_rejects_all() {
        let verifier = DigestVerifier::new("");
        assert!(!verifier.verify("anything"));
        assert!(!verifier.verify(""));
    }

    #[test]
    fn test_digest_is_case_insensitive_in_config() {
        let upper = DigestVerifier::digest_of("secret").to_uppercase();
        let verifier = DigestVerifier::new(upper);
        assert!(verifier.verify("secret"));
    }
}
