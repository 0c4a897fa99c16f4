//! Transfer orchestration: upload and download around the lifecycle gate
//!
//! Upload stores ciphertext first and creates the record second; a record
//! never references missing ciphertext, and a failed record creation rolls
//! the blob back. Download consumes through the gate and only then touches
//! the blob store.
//!
//! The service never sees plaintext or key material — sealing happens in the
//! sender's process, opening in the receiver's.

use bytes::Bytes;
use chrono::Utc;
use futures::stream::BoxStream;
use opendal::Operator;
use thiserror::Error;

use sealdrop_core::types::{new_share_id, ConsumeOutcome, DenyReason, ShareId, SharePolicy};
use sealdrop_core::ShareRecord;
use sealdrop_store::blobs;

use crate::gate::LifecycleGate;
use crate::records::{RecordStore, RecordStoreError};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("record store failure: {0}")]
    Records(#[from] RecordStoreError),
}

/// Store an already-sealed payload and register its access policy.
///
/// Returns the share id; the caller owns the secret token and assembles the
/// link. If blob storage fails no record is created; if record creation
/// fails the blob is removed again.
pub async fn upload(
    op: &Operator,
    records: &RecordStore,
    ciphertext: Vec<u8>,
    original_name: String,
    policy: SharePolicy,
) -> Result<ShareId, TransferError> {
    let id = new_share_id();
    let blob = blobs::blob_key(&id);

    blobs::put(op, &blob, ciphertext)
        .await
        .map_err(TransferError::Storage)?;

    let record = ShareRecord::new(id.clone(), blob.clone(), original_name, policy, Utc::now());
    if let Err(e) = records.create(record).await {
        if let Err(del) = blobs::delete(op, &blob).await {
            tracing::warn!(share = %id, "rollback: ciphertext delete failed: {del}");
        }
        return Err(e.into());
    }

    tracing::info!(share = %id, "share created");
    Ok(id)
}

/// Ciphertext bytes of a granted download.
pub enum DownloadBody {
    /// Streamed straight from the blob store.
    Streamed(BoxStream<'static, std::io::Result<Bytes>>),
    /// The exhausting download: read fully and the blob already deleted, so
    /// "gone" holds the moment these bytes are handed over.
    Buffered(Bytes),
}

pub struct Download {
    pub body: DownloadBody,
    pub original_name: String,
    pub length: u64,
}

pub enum DownloadOutcome {
    Ready(Download),
    Denied(DenyReason),
}

/// Attempt a download: consume through the gate, then produce ciphertext.
///
/// Denials return without touching the blob store. A granted attempt whose
/// blob read subsequently fails surfaces a [`TransferError`]; the consumed
/// unit is not refunded (the same rule as an aborted stream).
pub async fn download(
    gate: &LifecycleGate,
    id: &str,
    supplied_hex: Option<&str>,
) -> Result<DownloadOutcome, TransferError> {
    let grant = match gate.try_consume(id, supplied_hex).await {
        ConsumeOutcome::Denied(reason) => return Ok(DownloadOutcome::Denied(reason)),
        ConsumeOutcome::Granted(grant) => grant,
    };

    let op = gate.operator();
    let blob = &grant.record.ciphertext_ref;

    let download = if grant.exhausted {
        let bytes = blobs::read(op, blob)
            .await
            .map_err(TransferError::Storage)?;
        if let Err(e) = blobs::delete(op, blob).await {
            tracing::warn!(share = %id, "purge: ciphertext delete failed: {e}");
        }
        Download {
            length: bytes.len() as u64,
            body: DownloadBody::Buffered(bytes.into()),
            original_name: grant.record.original_name,
        }
    } else {
        let length = blobs::size(op, blob)
            .await
            .map_err(TransferError::Storage)?;
        let stream = blobs::stream(op, blob)
            .await
            .map_err(TransferError::Storage)?;
        Download {
            length,
            body: DownloadBody::Streamed(Box::pin(stream)),
            original_name: grant.record.original_name,
        }
    };

    Ok(DownloadOutcome::Ready(download))
}
