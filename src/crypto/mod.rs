//! Credential handling for the lockview gate.
//!
//! Nothing here encrypts the document: the protection offered by lockview is
//! that the artifact is deleted after use. This module only verifies the
//! password that opens the one viewing session.
//!
//! # Module Structure
//!
//! - `verifier`: Argon2id hashing and constant-time verification
//!
//! # Example
//!
//! ```
//! use lockview::crypto::{hash_password, CredentialVerifier};
//!
//! let verifier = CredentialVerifier::new(hash_password("secure123")?);
//! assert!(verifier.verify("secure123")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod verifier;

pub use self::verifier::{check_hash_format, hash_password, CredentialVerifier};
