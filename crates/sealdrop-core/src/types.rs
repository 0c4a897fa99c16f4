use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque share identifier (uuid v4, simple hex form). The id is the only
/// server-side handle for a share; the decryption secret never joins it in
/// any serialized structure.
pub type ShareId = String;

/// Generate a fresh share id.
pub fn new_share_id() -> ShareId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Upload-time access policy for a share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePolicy {
    /// Instant after which the share is unservable (strictly after).
    pub expires_at: DateTime<Utc>,
    /// Ceiling on successful downloads. Must be >= 1.
    pub max_downloads: u32,
    /// Optional SHA-256 password digest, lowercase hex. `None` = no gate.
    pub password_hash: Option<String>,
}

/// Server-held metadata and consumption state for one shared artifact.
///
/// `download_count` is mutated only by the record store's consume path and
/// never exceeds `max_downloads`. A record reaching its terminal state
/// (expired or exhausted) is purged, not flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: ShareId,
    /// Blob store key of the encrypted payload, owned exclusively by this
    /// record until purge.
    pub ciphertext_ref: String,
    /// Display filename for the response disposition header. Never used
    /// for access control.
    pub original_name: String,
    pub expires_at: DateTime<Utc>,
    pub max_downloads: u32,
    pub download_count: u32,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShareRecord {
    /// Build a new record from an upload.
    pub fn new(
        id: ShareId,
        ciphertext_ref: String,
        original_name: String,
        policy: SharePolicy,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ciphertext_ref,
            original_name,
            expires_at: policy.expires_at,
            max_downloads: policy.max_downloads,
            download_count: 0,
            password_hash: policy.password_hash,
            created_at,
        }
    }

    /// True once the share is past its expiry instant ("strictly after").
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// True once the download quota is fully consumed.
    pub fn exhausted(&self) -> bool {
        self.download_count >= self.max_downloads
    }
}

/// Why an access attempt was denied. These are expected, user-visible,
/// terminal results (except `BadPassword`, which the user may retry) —
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// Unknown or already-purged id.
    NotFound,
    /// Past `expires_at`.
    Expired,
    /// Download quota fully consumed.
    Exhausted,
    /// Stored digest present and the supplied one missing or mismatched.
    BadPassword,
}

/// A successful consume: one download unit was taken atomically.
#[derive(Debug, Clone)]
pub struct Grant {
    /// Snapshot of the record *before* the increment.
    pub record: ShareRecord,
    /// True when this grant consumed the last unit; the record is already
    /// purged and the ciphertext must be deleted once its bytes are served.
    pub exhausted: bool,
}

/// Outcome of a `try_consume` access attempt.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    Granted(Grant),
    Denied(DenyReason),
}
