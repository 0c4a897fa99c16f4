//! Payload sealing with XChaCha20-Poly1305
//!
//! `seal` output is the raw AEAD ciphertext: `[N bytes: ciphertext][16 bytes:
//! Poly1305 tag]`. The nonce is deliberately NOT prepended — it belongs to the
//! fragment secret and travels out-of-band from the ciphertext.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use thiserror::Error;

use crate::keys::{generate_key, generate_nonce, Nonce, SecretKey};

#[derive(Debug, Error)]
pub enum SealError {
    /// Authentication failed: tampered ciphertext, wrong key, or wrong
    /// nonce. Indistinguishable on purpose — no partial plaintext either.
    #[error("payload integrity check failed")]
    Integrity,

    #[error("encryption failed: {0}")]
    Encrypt(String),
}

/// A freshly sealed payload and the secret material that opens it.
pub struct Sealed {
    /// AEAD ciphertext including the trailing tag.
    pub ciphertext: Vec<u8>,
    pub key: SecretKey,
    pub nonce: Nonce,
}

/// Seal a payload under a fresh random key and nonce.
pub fn seal(plaintext: &[u8]) -> Result<Sealed, SealError> {
    let key = generate_key();
    let nonce = generate_nonce();

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|e| SealError::Encrypt(e.to_string()))?;

    Ok(Sealed {
        ciphertext,
        key,
        nonce,
    })
}

/// Open a sealed payload.
///
/// Fails with [`SealError::Integrity`] on any authentication failure and
/// returns the full plaintext otherwise — never a partial buffer.
pub fn open(ciphertext: &[u8], key: &SecretKey, nonce: &Nonce) -> Result<Vec<u8>, SealError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| SealError::Integrity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TAG_SIZE;
    use proptest::prelude::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let plaintext = b"hello, sealed world!";

        let sealed = seal(plaintext).unwrap();
        let opened = open(&sealed.ciphertext, &sealed.key, &sealed.nonce).unwrap();

        assert_eq!(&opened, plaintext);
    }

    #[test]
    fn test_seal_open_empty() {
        let sealed = seal(b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE, "tag only");

        let opened = open(&sealed.ciphertext, &sealed.key, &sealed.nonce).unwrap();
        assert_eq!(opened, b"");
    }

    #[test]
    fn test_fresh_key_and_nonce_per_seal() {
        let a = seal(b"same plaintext").unwrap();
        let b = seal(b"same plaintext").unwrap();

        assert_ne!(a.key.as_bytes(), b.key.as_bytes());
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_open_wrong_key() {
        let sealed = seal(b"secret data").unwrap();
        let wrong = generate_key();

        let result = open(&sealed.ciphertext, &wrong, &sealed.nonce);
        assert!(matches!(result, Err(SealError::Integrity)));
    }

    #[test]
    fn test_open_wrong_nonce() {
        let sealed = seal(b"secret data").unwrap();
        let wrong = generate_nonce();

        let result = open(&sealed.ciphertext, &sealed.key, &wrong);
        assert!(matches!(result, Err(SealError::Integrity)));
    }

    #[test]
    fn test_ciphertext_size() {
        let sealed = seal(&[0u8; 1000]).unwrap();
        // plaintext (1000) + tag (16) = 1016; nonce travels separately
        assert_eq!(sealed.ciphertext.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_tampered_ciphertext() {
        let mut sealed = seal(b"secret data").unwrap();
        sealed.ciphertext[3] ^= 0xFF;

        let result = open(&sealed.ciphertext, &sealed.key, &sealed.nonce);
        assert!(matches!(result, Err(SealError::Integrity)));
    }

    #[test]
    fn test_tampered_tag() {
        let mut sealed = seal(b"secret data").unwrap();
        let last = sealed.ciphertext.len() - 1;
        sealed.ciphertext[last] ^= 0x01;

        let result = open(&sealed.ciphertext, &sealed.key, &sealed.nonce);
        assert!(matches!(result, Err(SealError::Integrity)));
    }

    proptest! {
        #[test]
        fn roundtrip_any_payload(data in proptest::collection::vec(any::<u8>(), 0..=4096)) {
            let sealed = seal(&data).unwrap();
            let opened = open(&sealed.ciphertext, &sealed.key, &sealed.nonce).unwrap();
            prop_assert_eq!(opened, data);
        }

        #[test]
        fn any_single_bit_flip_fails(
            data in proptest::collection::vec(any::<u8>(), 1..=512),
            byte_idx in any::<usize>(),
            bit in 0u8..8,
        ) {
            let mut sealed = seal(&data).unwrap();
            let idx = byte_idx % sealed.ciphertext.len();
            sealed.ciphertext[idx] ^= 1 << bit;

            let result = open(&sealed.ciphertext, &sealed.key, &sealed.nonce);
            prop_assert!(matches!(result, Err(SealError::Integrity)));
        }
    }
}
