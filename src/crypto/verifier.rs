//! Credential verification against a stored salted hash.
//!
//! The stored credential is an Argon2id PHC string. Verification goes through
//! `argon2`'s `PasswordVerifier`, which recomputes the digest with the salt and
//! cost parameters embedded in the hash and compares the outputs in constant
//! time.

use crate::errors::VerificationError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params};
use std::fmt;
use tracing::debug;
use zeroize::Zeroizing;

/// Checks submitted secrets against one process-wide credential hash.
///
/// The hash is immutable after construction and is never exposed; `verify`
/// is the only operation on it.
///
/// # Example
///
/// ```
/// use lockview::crypto::{hash_password, CredentialVerifier};
///
/// let hash = hash_password("secure123")?;
/// let verifier = CredentialVerifier::new(hash);
/// assert!(verifier.verify("secure123")?);
/// assert!(!verifier.verify("wrongpassword")?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct CredentialVerifier {
    hash: String,
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("hash", &crate::constants::REDACTED_PLACEHOLDER)
            .finish()
    }
}

impl CredentialVerifier {
    /// Wraps a PHC-formatted hash. The format is checked lazily by `verify`.
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }

    /// Returns `Ok(true)` if `candidate` matches the stored hash.
    ///
    /// A wrong password is `Ok(false)`, never an error.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::MalformedHash` if the stored hash cannot be parsed,
    /// or `VerificationError::Internal` if the hasher fails for any other reason.
    pub fn verify(&self, candidate: &str) -> Result<bool, VerificationError> {
        let candidate = Zeroizing::new(candidate.as_bytes().to_vec());
        let parsed = parse_hash(&self.hash)?;

        let matched = match Argon2::default().verify_password(&candidate, &parsed) {
            Ok(()) => true,
            Err(password_hash::Error::Password) => false,
            Err(e) => return Err(VerificationError::Internal(e.to_string())),
        };

        debug!(matched, "Credential verification completed");
        Ok(matched)
    }
}

/// Hashes `secret` with Argon2id and a fresh random salt.
///
/// Returns the PHC string to store as the credential hash.
///
/// # Errors
///
/// Returns `VerificationError::Hashing` if the hasher rejects its input.
pub fn hash_password(secret: &str) -> Result<String, VerificationError> {
    let secret = Zeroizing::new(secret.as_bytes().to_vec());
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(&secret, &salt)
        .map_err(|e| VerificationError::Hashing(e.to_string()))?
        .to_string();

    debug!("Credential hashed with Argon2id");
    Ok(hash)
}

/// Returns an error if `hash` is not an Argon2 PHC string with usable parameters.
pub fn check_hash_format(hash: &str) -> Result<(), VerificationError> {
    parse_hash(hash).map(|_| ())
}

fn parse_hash(hash: &str) -> Result<PasswordHash<'_>, VerificationError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| VerificationError::MalformedHash(e.to_string()))?;
    Algorithm::try_from(parsed.algorithm).map_err(|_| {
        VerificationError::MalformedHash(format!("unsupported algorithm '{}'", parsed.algorithm))
    })?;
    Params::try_from(&parsed)
        .map_err(|e| VerificationError::MalformedHash(format!("invalid parameters: {}", e)))?;
    Ok(parsed)
}
