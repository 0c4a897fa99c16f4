//! Fragment secret codec
//!
//! Token format: `base64url(key) "." base64url(nonce)`, no padding.
//!
//! ```text
//! https://host/download/{id}#4fz…Qw.9bk…Zg
//!                           └──────┬─────┘
//!                        never sent over HTTP
//! ```
//!
//! The token lives exclusively in the URL fragment, which browsers and HTTP
//! clients strip before the request leaves the machine — that convention,
//! not server code, is what keeps the server unable to decrypt anything it
//! stores. `.` is outside the base64url alphabet (and unreserved in URIs),
//! so the split is unambiguous and survives copy-paste re-encoding.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use thiserror::Error;

use crate::keys::{Nonce, SecretKey};
use crate::{KEY_SIZE, NONCE_SIZE};

const SEPARATOR: char = '.';

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret token has no separator")]
    MissingSeparator,

    #[error("secret token is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("secret token key has wrong length: {0} bytes (expected {KEY_SIZE})")]
    BadKeyLength(usize),

    #[error("secret token nonce has wrong length: {0} bytes (expected {NONCE_SIZE})")]
    BadNonceLength(usize),
}

/// Encode (key, nonce) into the fragment token.
pub fn encode_secret(key: &SecretKey, nonce: &Nonce) -> String {
    format!(
        "{}{SEPARATOR}{}",
        URL_SAFE_NO_PAD.encode(key.as_bytes()),
        URL_SAFE_NO_PAD.encode(nonce)
    )
}

/// Decode a fragment token back into (key, nonce).
pub fn decode_secret(token: &str) -> Result<(SecretKey, Nonce), SecretError> {
    let (key_part, nonce_part) = token
        .split_once(SEPARATOR)
        .ok_or(SecretError::MissingSeparator)?;

    let key_bytes = URL_SAFE_NO_PAD.decode(key_part)?;
    if key_bytes.len() != KEY_SIZE {
        return Err(SecretError::BadKeyLength(key_bytes.len()));
    }

    let nonce_bytes = URL_SAFE_NO_PAD.decode(nonce_part)?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(SecretError::BadNonceLength(nonce_bytes.len()));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&key_bytes);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&nonce_bytes);

    Ok((SecretKey::from_bytes(key), nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_key, generate_nonce};
    use proptest::prelude::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let key = generate_key();
        let nonce = generate_nonce();

        let token = encode_secret(&key, &nonce);
        let (key2, nonce2) = decode_secret(&token).unwrap();

        assert_eq!(key.as_bytes(), key2.as_bytes());
        assert_eq!(nonce, nonce2);
    }

    #[test]
    fn test_token_is_fragment_safe() {
        let token = encode_secret(&generate_key(), &generate_nonce());
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
        assert_eq!(token.matches('.').count(), 1);
    }

    #[test]
    fn test_decode_missing_separator() {
        let result = decode_secret("abcdef");
        assert!(matches!(result, Err(SecretError::MissingSeparator)));
    }

    #[test]
    fn test_decode_invalid_base64() {
        let result = decode_secret("not!valid.also!bad");
        assert!(matches!(result, Err(SecretError::Base64(_))));
    }

    #[test]
    fn test_decode_short_key() {
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode([1u8; 16]),
            URL_SAFE_NO_PAD.encode(generate_nonce())
        );
        assert!(matches!(
            decode_secret(&token),
            Err(SecretError::BadKeyLength(16))
        ));
    }

    #[test]
    fn test_decode_short_nonce() {
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(generate_key().as_bytes()),
            URL_SAFE_NO_PAD.encode([1u8; 12])
        );
        assert!(matches!(
            decode_secret(&token),
            Err(SecretError::BadNonceLength(12))
        ));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_secret("").is_err());
        assert!(decode_secret(".").is_err());
    }

    proptest! {
        #[test]
        fn roundtrip_any_material(
            key_bytes in proptest::array::uniform32(any::<u8>()),
            nonce_head in proptest::array::uniform32(any::<u8>()),
        ) {
            let key = SecretKey::from_bytes(key_bytes);
            let mut nonce = [0u8; NONCE_SIZE];
            nonce.copy_from_slice(&nonce_head[..NONCE_SIZE]);

            let token = encode_secret(&key, &nonce);
            let (key2, nonce2) = decode_secret(&token).unwrap();
            prop_assert_eq!(key.as_bytes(), key2.as_bytes());
            prop_assert_eq!(nonce, nonce2);
        }
    }
}
