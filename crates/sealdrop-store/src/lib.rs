//! sealdrop-store: OpenDAL storage boundary for encrypted payloads
//!
//! The server only ever handles ciphertext; this crate does not know (or
//! need to know) anything about keys. Backends: `memory` (tests, ephemeral
//! deployments), `fs` (single host), `s3` (SeaweedFS/MinIO/AWS).

pub mod blobs;
pub mod health;
pub mod operator;

pub use health::check_health;
pub use operator::build_operator;
