//! Share record store — the persistence boundary and the atomic consume
//!
//! In-memory map persisted to a JSON file with write-through atomic
//! (temp+rename) rewrites. All mutation goes through a single lock, so the
//! read→check→increment→purge sequence in [`RecordStore::try_consume`] is
//! serialized per store: across any number of concurrent attempts on one id,
//! exactly `max_downloads` consumptions can succeed.
//!
//! Check order in `try_consume` is fixed: existence → expiry → quota →
//! password. A terminal record (expired or exhausted) is removed inside the
//! same locked section, so later callers observe not-found, never a stale
//! entry.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

use sealdrop_core::types::{DenyReason, Grant, ShareId, ShareRecord};
use sealdrop_crypto::PasswordDigest;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("record database I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record database serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("duplicate share id: {0}")]
    Duplicate(ShareId),
}

/// Result of the atomic consume primitive.
///
/// When a purge happened during the attempt (expiry discovered lazily, or a
/// quota found already spent), the orphaned ciphertext key is reported so
/// the caller can delete the blob — the record itself is already gone.
#[derive(Debug)]
pub enum StoreConsume {
    Granted(Grant),
    Denied {
        reason: DenyReason,
        purged_ciphertext: Option<String>,
    },
}

struct Inner {
    db_path: Option<PathBuf>,
    entries: HashMap<ShareId, ShareRecord>,
}

/// Persistent store of [`ShareRecord`]s.
pub struct RecordStore {
    inner: Mutex<Inner>,
}

impl RecordStore {
    /// Load or create a record database at the given path.
    /// If the file doesn't exist, starts empty.
    pub fn open(db_path: &Path) -> Result<Self, RecordStoreError> {
        let entries = if db_path.exists() {
            let content = std::fs::read_to_string(db_path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                db_path: Some(db_path.to_path_buf()),
                entries,
            }),
        })
    }

    /// Ephemeral store with no backing file (tests, memory deployments).
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner {
                db_path: None,
                entries: HashMap::new(),
            }),
        }
    }

    /// Insert a freshly created record. A failed flush rolls the insert
    /// back, so an upload error never leaves a live record behind.
    pub async fn create(&self, record: ShareRecord) -> Result<(), RecordStoreError> {
        let mut inner = self.inner.lock().await;
        if inner.entries.contains_key(&record.id) {
            return Err(RecordStoreError::Duplicate(record.id));
        }
        let id = record.id.clone();
        inner.entries.insert(id.clone(), record);
        if let Err(e) = flush(&inner) {
            inner.entries.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Snapshot of a record, if it exists (i.e. not purged).
    pub async fn get(&self, id: &str) -> Option<ShareRecord> {
        self.inner.lock().await.entries.get(id).cloned()
    }

    /// Number of live records.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Atomically attempt to consume one download unit.
    ///
    /// The entire sequence runs under the store lock; on success the
    /// returned [`Grant`] carries the pre-increment snapshot. The grant that
    /// reaches the cap also removes the record (PURGED) before the lock is
    /// released, so no later attempt can be granted even while the final
    /// response is still streaming.
    pub async fn try_consume(
        &self,
        id: &str,
        supplied: Option<&PasswordDigest>,
        now: DateTime<Utc>,
    ) -> StoreConsume {
        let mut inner = self.inner.lock().await;

        // Decide first, then mutate; both phases are under the same lock.
        // The order of checks is load-bearing: existence, expiry, quota,
        // password — a denial must not leak the state of a later check.
        let verdict = match inner.entries.get(id) {
            None => Verdict::NotFound,
            Some(record) if record.expired_at(now) => Verdict::PurgeExpired,
            Some(record) if record.exhausted() => Verdict::PurgeExhausted,
            Some(record) => {
                if password_matches(record, supplied) {
                    Verdict::Grant
                } else {
                    Verdict::BadPassword
                }
            }
        };

        match verdict {
            Verdict::NotFound => StoreConsume::Denied {
                reason: DenyReason::NotFound,
                purged_ciphertext: None,
            },
            Verdict::BadPassword => StoreConsume::Denied {
                reason: DenyReason::BadPassword,
                purged_ciphertext: None,
            },
            // expiry is detected lazily; purge on the spot
            Verdict::PurgeExpired => {
                let purged = inner.entries.remove(id).expect("entry checked");
                log_flush(&inner);
                StoreConsume::Denied {
                    reason: DenyReason::Expired,
                    purged_ciphertext: Some(purged.ciphertext_ref),
                }
            }
            // normally unreachable, since the exhausting grant purges;
            // covers state recovered from an interrupted purge
            Verdict::PurgeExhausted => {
                let purged = inner.entries.remove(id).expect("entry checked");
                log_flush(&inner);
                StoreConsume::Denied {
                    reason: DenyReason::Exhausted,
                    purged_ciphertext: Some(purged.ciphertext_ref),
                }
            }
            Verdict::Grant => {
                let record = inner.entries.get_mut(id).expect("entry checked");
                let snapshot = record.clone();
                record.download_count += 1;
                let exhausted = record.download_count >= record.max_downloads;
                if exhausted {
                    inner.entries.remove(id);
                }
                log_flush(&inner);
                StoreConsume::Granted(Grant {
                    record: snapshot,
                    exhausted,
                })
            }
        }
    }
}

enum Verdict {
    NotFound,
    PurgeExpired,
    PurgeExhausted,
    BadPassword,
    Grant,
}

/// Constant-time digest comparison for the password gate. An ungated record
/// accepts any attempt; a gated one requires a matching supplied digest.
fn password_matches(record: &ShareRecord, supplied: Option<&PasswordDigest>) -> bool {
    let Some(stored_hex) = &record.password_hash else {
        return true;
    };
    match (PasswordDigest::from_hex(stored_hex), supplied) {
        (Ok(stored), Some(supplied)) => stored.ct_eq(supplied),
        _ => false,
    }
}

/// Write-through flush using an atomic write (write temp, then rename).
fn flush(inner: &Inner) -> Result<(), RecordStoreError> {
    let Some(db_path) = &inner.db_path else {
        return Ok(());
    };

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&inner.entries)?;
    let tmp_path = db_path.with_extension("tmp");
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, db_path)?;
    Ok(())
}

/// Flush variant for the consume path: the in-memory transition already
/// happened and is authoritative for quota enforcement, so a failed disk
/// write is logged rather than surfaced.
fn log_flush(inner: &Inner) {
    if let Err(e) = flush(inner) {
        tracing::warn!("record database flush failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sealdrop_core::types::{new_share_id, SharePolicy};
    use sealdrop_crypto::hash_password;

    fn policy(expires_in_secs: i64, max_downloads: u32) -> SharePolicy {
        SharePolicy {
            expires_at: Utc::now() + Duration::seconds(expires_in_secs),
            max_downloads,
            password_hash: None,
        }
    }

    fn record(policy: SharePolicy) -> ShareRecord {
        let id = new_share_id();
        ShareRecord::new(
            id.clone(),
            format!("shares/{id}"),
            "notes.txt".into(),
            policy,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn create_get_roundtrip() {
        let store = RecordStore::in_memory();
        let rec = record(policy(60, 1));
        let id = rec.id.clone();

        store.create(rec).await.unwrap();
        let got = store.get(&id).await.unwrap();
        assert_eq!(got.download_count, 0);
        assert_eq!(got.original_name, "notes.txt");
    }

    #[tokio::test]
    async fn duplicate_id_rejected() {
        let store = RecordStore::in_memory();
        let rec = record(policy(60, 1));

        store.create(rec.clone()).await.unwrap();
        let err = store.create(rec).await.unwrap_err();
        assert!(matches!(err, RecordStoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("records.json");
        let rec = record(policy(60, 3));
        let id = rec.id.clone();

        let store = RecordStore::open(&db).unwrap();
        store.create(rec).await.unwrap();
        assert!(matches!(
            store.try_consume(&id, None, Utc::now()).await,
            StoreConsume::Granted(_)
        ));
        drop(store);

        let reloaded = RecordStore::open(&db).unwrap();
        let got = reloaded.get(&id).await.unwrap();
        assert_eq!(got.download_count, 1, "consumed state must survive restart");
    }

    #[tokio::test]
    async fn consume_unknown_id_is_not_found() {
        let store = RecordStore::in_memory();
        let result = store.try_consume("no-such-id", None, Utc::now()).await;
        assert!(matches!(
            result,
            StoreConsume::Denied {
                reason: DenyReason::NotFound,
                purged_ciphertext: None,
            }
        ));
    }

    #[tokio::test]
    async fn expired_record_denied_and_purged() {
        let store = RecordStore::in_memory();
        let rec = record(policy(-1, 5));
        let id = rec.id.clone();
        let blob = rec.ciphertext_ref.clone();
        store.create(rec).await.unwrap();

        let result = store.try_consume(&id, None, Utc::now()).await;
        match result {
            StoreConsume::Denied {
                reason: DenyReason::Expired,
                purged_ciphertext: Some(r),
            } => assert_eq!(r, blob),
            other => panic!("expected expired purge, got {other:?}"),
        }

        // purge is terminal: the id no longer exists
        assert!(store.get(&id).await.is_none());
        assert!(matches!(
            store.try_consume(&id, None, Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn expiry_boundary_is_strictly_after() {
        let store = RecordStore::in_memory();
        let rec = record(policy(60, 1));
        let id = rec.id.clone();
        let deadline = rec.expires_at;
        store.create(rec).await.unwrap();

        // exactly at the deadline: still servable
        assert!(matches!(
            store.try_consume(&id, None, deadline).await,
            StoreConsume::Granted(_)
        ));
    }

    #[tokio::test]
    async fn expiry_checked_before_quota_and_password() {
        // expired AND exhausted AND password-gated: expiry must win
        let store = RecordStore::in_memory();
        let mut rec = record(SharePolicy {
            expires_at: Utc::now() - Duration::seconds(5),
            max_downloads: 1,
            password_hash: Some(hash_password("pw").to_hex()),
        });
        rec.download_count = 1;
        let id = rec.id.clone();
        store.create(rec).await.unwrap();

        assert!(matches!(
            store.try_consume(&id, None, Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::Expired,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn quota_checked_before_password() {
        let store = RecordStore::in_memory();
        let mut rec = record(SharePolicy {
            expires_at: Utc::now() + Duration::seconds(60),
            max_downloads: 1,
            password_hash: Some(hash_password("pw").to_hex()),
        });
        rec.download_count = 1;
        let id = rec.id.clone();
        store.create(rec).await.unwrap();

        // wrong password supplied, but the spent quota is reported first
        let wrong = hash_password("wrong");
        assert!(matches!(
            store.try_consume(&id, Some(&wrong), Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::Exhausted,
                purged_ciphertext: Some(_),
            }
        ));
    }

    #[tokio::test]
    async fn wrong_password_denied_without_consuming() {
        let store = RecordStore::in_memory();
        let rec = record(SharePolicy {
            expires_at: Utc::now() + Duration::seconds(60),
            max_downloads: 1,
            password_hash: Some(hash_password("secret").to_hex()),
        });
        let id = rec.id.clone();
        store.create(rec).await.unwrap();

        let wrong = hash_password("not-it");
        assert!(matches!(
            store.try_consume(&id, Some(&wrong), Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::BadPassword,
                purged_ciphertext: None,
            }
        ));

        // missing password on a gated share is also a password denial
        assert!(matches!(
            store.try_consume(&id, None, Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::BadPassword,
                ..
            }
        ));

        // quota untouched: the correct digest still gets the only download
        let right = hash_password("secret");
        match store.try_consume(&id, Some(&right), Utc::now()).await {
            StoreConsume::Granted(grant) => {
                assert_eq!(grant.record.download_count, 0, "pre-increment snapshot");
                assert!(grant.exhausted);
            }
            other => panic!("expected grant, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn password_ignored_when_share_is_ungated() {
        let store = RecordStore::in_memory();
        let rec = record(policy(60, 1));
        let id = rec.id.clone();
        store.create(rec).await.unwrap();

        let stray = hash_password("anything");
        assert!(matches!(
            store.try_consume(&id, Some(&stray), Utc::now()).await,
            StoreConsume::Granted(_)
        ));
    }

    #[tokio::test]
    async fn exhausting_grant_purges_record() {
        let store = RecordStore::in_memory();
        let rec = record(policy(60, 2));
        let id = rec.id.clone();
        store.create(rec).await.unwrap();

        match store.try_consume(&id, None, Utc::now()).await {
            StoreConsume::Granted(grant) => {
                assert_eq!(grant.record.download_count, 0);
                assert!(!grant.exhausted);
            }
            other => panic!("expected grant, got {other:?}"),
        }

        match store.try_consume(&id, None, Utc::now()).await {
            StoreConsume::Granted(grant) => {
                assert_eq!(grant.record.download_count, 1);
                assert!(grant.exhausted, "second grant consumes the last unit");
            }
            other => panic!("expected grant, got {other:?}"),
        }

        // purged, not merely flagged: NotFound rather than Exhausted
        assert!(matches!(
            store.try_consume(&id, None, Utc::now()).await,
            StoreConsume::Denied {
                reason: DenyReason::NotFound,
                ..
            }
        ));
        assert_eq!(store.len().await, 0);
    }
}
