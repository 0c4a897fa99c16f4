//! Password digests for the download gate
//!
//! The digest is computed client-side and compared server-side for equality
//! only — it is a bearer token, not a stored credential, which is why a
//! deterministic unsalted hash is the right primitive here. The server never
//! sees the password itself.
//!
//! A share without a password has no digest at all. Callers represent that
//! with `Option::None`; the empty string is never hashed as a stand-in.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::DIGEST_SIZE;

#[derive(Debug, Error, PartialEq)]
pub enum DigestError {
    #[error("password digest has wrong length: {0} bytes (expected {DIGEST_SIZE})")]
    BadLength(usize),

    #[error("password digest is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// A SHA-256 password digest, transported as lowercase hex.
#[derive(Clone)]
pub struct PasswordDigest {
    bytes: [u8; DIGEST_SIZE],
}

impl PasswordDigest {
    pub fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.bytes
    }

    /// Lowercase hex form (64 chars), as carried in requests and records.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse the hex transport form. Accepts upper or lower case.
    pub fn from_hex(s: &str) -> Result<Self, DigestError> {
        let decoded = hex::decode(s)?;
        if decoded.len() != DIGEST_SIZE {
            return Err(DigestError::BadLength(decoded.len()));
        }
        let mut bytes = [0u8; DIGEST_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// Constant-time equality. The only supported comparison — an early-exit
    /// compare would leak matching-prefix length to a timing observer.
    pub fn ct_eq(&self, other: &PasswordDigest) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Hash a password into its gate digest.
pub fn hash_password(password: &str) -> PasswordDigest {
    let digest = Sha256::digest(password.as_bytes());
    let mut bytes = [0u8; DIGEST_SIZE];
    bytes.copy_from_slice(&digest);
    PasswordDigest::from_bytes(bytes)
}
