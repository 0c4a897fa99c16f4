//! Payload key and nonce generation

use rand::RngCore;
use zeroize::Zeroize;

use crate::{KEY_SIZE, NONCE_SIZE};

/// An XChaCha20-Poly1305 nonce. Not secret by itself, but together with the
/// key it forms the fragment secret, so it is never persisted server-side.
pub type Nonce = [u8; NONCE_SIZE];

/// A per-upload 256-bit payload key. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey {
    bytes: [u8; KEY_SIZE],
}

impl SecretKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit payload key.
pub fn generate_key() -> SecretKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    SecretKey::from_bytes(bytes)
}

/// Generate a random 24-byte nonce.
///
/// The key is fresh per upload, so nonce reuse under one key cannot occur;
/// the random nonce still guards against key material ever being shared.
pub fn generate_nonce() -> Nonce {
    let mut bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}
