//! sealdrop-crypto: client-side encryption for sealdrop
//!
//! Every upload is sealed locally before any byte leaves the sender:
//!
//! ```text
//! plaintext ── XChaCha20-Poly1305 (fresh 256-bit key, fresh 24-byte nonce)
//!          └─> ciphertext+tag  ── uploaded, stored server-side
//!              (key, nonce)    ── encoded as the URL fragment token,
//!                                 never transmitted to the server
//! ```
//!
//! The ciphertext does NOT embed the nonce: key and nonce travel together in
//! the fragment token, the ciphertext travels alone through the server. The
//! two paths are only rejoined in the receiver's process.

pub mod keys;
pub mod password;
pub mod seal;
pub mod secret;

pub use keys::{generate_key, generate_nonce, Nonce, SecretKey};
pub use password::{hash_password, DigestError, PasswordDigest};
pub use seal::{open, seal, SealError, Sealed};
pub use secret::{decode_secret, encode_secret, SecretError};

/// Size of a payload key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of a password digest (SHA-256)
pub const DIGEST_SIZE: usize = 32;
