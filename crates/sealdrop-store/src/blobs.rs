//! Ciphertext blob operations
//!
//! One blob per share, keyed `shares/{id}`. The key string is stored in the
//! owning record as its `ciphertext_ref`; a blob is owned by exactly one
//! record from creation to purge, and nothing else ever references it.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::Stream;
use opendal::Operator;

/// Blob store key for a share's ciphertext.
pub fn blob_key(id: &str) -> String {
    format!("shares/{id}")
}

/// Store a ciphertext blob. Overwrites are not expected — ids are fresh
/// per upload.
pub async fn put(op: &Operator, key: &str, ciphertext: Vec<u8>) -> Result<()> {
    op.write(key, ciphertext)
        .await
        .with_context(|| format!("writing ciphertext blob {key}"))?;
    Ok(())
}

/// Read a ciphertext blob fully into memory.
pub async fn read(op: &Operator, key: &str) -> Result<Vec<u8>> {
    let buf = op
        .read(key)
        .await
        .with_context(|| format!("reading ciphertext blob {key}"))?;
    Ok(buf.to_vec())
}

/// Open a ciphertext blob as a byte stream for response bodies.
pub async fn stream(
    op: &Operator,
    key: &str,
) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static> {
    let reader = op
        .reader(key)
        .await
        .with_context(|| format!("opening ciphertext blob {key}"))?;
    let stream = reader
        .into_bytes_stream(..)
        .await
        .with_context(|| format!("streaming ciphertext blob {key}"))?;
    Ok(stream)
}

/// Size of a ciphertext blob in bytes.
pub async fn size(op: &Operator, key: &str) -> Result<u64> {
    let meta = op
        .stat(key)
        .await
        .with_context(|| format!("stat ciphertext blob {key}"))?;
    Ok(meta.content_length())
}

/// Delete a ciphertext blob.
pub async fn delete(op: &Operator, key: &str) -> Result<()> {
    op.delete(key)
        .await
        .with_context(|| format!("deleting ciphertext blob {key}"))?;
    Ok(())
}
