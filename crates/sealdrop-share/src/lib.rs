//! sealdrop-share: the share lifecycle
//!
//! State machine per share record:
//!
//! ```text
//! ACTIVE ──(consume reaches cap)──> EXHAUSTED ──(purge)──> PURGED
//!    └────(access after expiry)───> EXPIRED ────(purge)──> PURGED
//! ```
//!
//! PURGED is terminal: record and ciphertext are deleted, later access
//! behaves as not-found. Expiry is detected lazily at access time; purge of
//! an exhausted share happens inside the same access that exhausts it.
//!
//! Layering: [`records::RecordStore`] owns the atomic read-check-increment
//! (the only contended mutable state), [`gate::LifecycleGate`] is the single
//! authorization/mutation funnel on top of it, and [`transfer`] orchestrates
//! blob I/O around the gate.

pub mod gate;
pub mod records;
pub mod transfer;

pub use gate::LifecycleGate;
pub use records::{RecordStore, RecordStoreError, StoreConsume};
pub use transfer::{download, upload, Download, DownloadBody, DownloadOutcome, TransferError};
