//! Lifecycle gate — the single authorization and mutation funnel
//!
//! Every access attempt goes through [`LifecycleGate::try_consume`]; nothing
//! else mutates a record's consumption state or deletes its ciphertext. The
//! gate resolves the supplied password digest, drives the store's atomic
//! consume, and completes purges:
//!
//! - expired purge: the ciphertext is deleted here, before the denial is
//!   returned — no response is owed any bytes;
//! - exhausted purge: the record is already gone when the grant is returned,
//!   so no further grant is possible even mid-stream; ciphertext deletion is
//!   the transfer layer's duty once the final bytes are produced.

use chrono::Utc;
use opendal::Operator;
use std::sync::Arc;

use sealdrop_core::types::ConsumeOutcome;
use sealdrop_crypto::PasswordDigest;

use crate::records::{RecordStore, StoreConsume};

pub struct LifecycleGate {
    records: Arc<RecordStore>,
    op: Operator,
}

impl LifecycleGate {
    pub fn new(records: Arc<RecordStore>, op: Operator) -> Self {
        Self { records, op }
    }

    pub(crate) fn operator(&self) -> &Operator {
        &self.op
    }

    /// Evaluate an access attempt and, if allowed, consume one download unit.
    ///
    /// `supplied_hex` is the password digest exactly as it arrived in the
    /// request. A malformed digest behaves as a wrong password on a gated
    /// share (and is ignored on an ungated one) — it never becomes a
    /// distinct error, so the response does not leak which check failed.
    pub async fn try_consume(&self, id: &str, supplied_hex: Option<&str>) -> ConsumeOutcome {
        let supplied = supplied_hex.and_then(|s| PasswordDigest::from_hex(s).ok());

        match self
            .records
            .try_consume(id, supplied.as_ref(), Utc::now())
            .await
        {
            StoreConsume::Granted(grant) => {
                tracing::debug!(
                    share = %id,
                    downloads = grant.record.download_count + 1,
                    max = grant.record.max_downloads,
                    exhausted = grant.exhausted,
                    "download granted"
                );
                ConsumeOutcome::Granted(grant)
            }
            StoreConsume::Denied {
                reason,
                purged_ciphertext,
            } => {
                if let Some(blob) = purged_ciphertext {
                    if let Err(e) = sealdrop_store::blobs::delete(&self.op, &blob).await {
                        // record is already gone; an orphaned blob is
                        // unreachable and can be swept out of band
                        tracing::warn!(share = %id, "purge: ciphertext delete failed: {e}");
                    } else {
                        tracing::info!(share = %id, reason = ?reason, "share purged");
                    }
                }
                tracing::debug!(share = %id, reason = ?reason, "download denied");
                ConsumeOutcome::Denied(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sealdrop_core::types::{new_share_id, DenyReason, SharePolicy, ShareRecord};

    fn memory_operator() -> Operator {
        Operator::new(opendal::services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    async fn seeded_gate(expires_in: i64) -> (LifecycleGate, String, String) {
        let op = memory_operator();
        let records = Arc::new(RecordStore::in_memory());

        let id = new_share_id();
        let blob = sealdrop_store::blobs::blob_key(&id);
        sealdrop_store::blobs::put(&op, &blob, b"ciphertext".to_vec())
            .await
            .unwrap();
        records
            .create(ShareRecord::new(
                id.clone(),
                blob.clone(),
                "a.bin".into(),
                SharePolicy {
                    expires_at: Utc::now() + Duration::seconds(expires_in),
                    max_downloads: 1,
                    password_hash: None,
                },
                Utc::now(),
            ))
            .await
            .unwrap();

        (LifecycleGate::new(records, op), id, blob)
    }

    #[tokio::test]
    async fn expired_access_deletes_ciphertext() {
        let (gate, id, blob) = seeded_gate(-5).await;

        let outcome = gate.try_consume(&id, None).await;
        assert!(matches!(
            outcome,
            ConsumeOutcome::Denied(DenyReason::Expired)
        ));

        assert!(
            sealdrop_store::blobs::read(gate.operator(), &blob)
                .await
                .is_err(),
            "expired purge must delete the ciphertext"
        );
    }

    #[tokio::test]
    async fn exhausting_grant_leaves_ciphertext_for_the_stream() {
        let (gate, id, blob) = seeded_gate(60).await;

        match gate.try_consume(&id, None).await {
            ConsumeOutcome::Granted(grant) => assert!(grant.exhausted),
            other => panic!("expected grant, got {other:?}"),
        }

        // record purged, blob still there until the transfer layer serves it
        assert!(matches!(
            gate.try_consume(&id, None).await,
            ConsumeOutcome::Denied(DenyReason::NotFound)
        ));
        assert!(sealdrop_store::blobs::read(gate.operator(), &blob)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn malformed_digest_is_a_wrong_password() {
        let op = memory_operator();
        let records = Arc::new(RecordStore::in_memory());
        let id = new_share_id();
        records
            .create(ShareRecord::new(
                id.clone(),
                sealdrop_store::blobs::blob_key(&id),
                "a.bin".into(),
                SharePolicy {
                    expires_at: Utc::now() + Duration::seconds(60),
                    max_downloads: 1,
                    password_hash: Some(sealdrop_crypto::hash_password("pw").to_hex()),
                },
                Utc::now(),
            ))
            .await
            .unwrap();
        let gate = LifecycleGate::new(records, op);

        let outcome = gate.try_consume(&id, Some("not-hex-at-all")).await;
        assert!(matches!(
            outcome,
            ConsumeOutcome::Denied(DenyReason::BadPassword)
        ));
    }
}
