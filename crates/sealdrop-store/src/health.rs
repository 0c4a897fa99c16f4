//! Storage health check

use anyhow::Result;
use opendal::Operator;

/// Verify the blob backend is reachable and the configured bucket/root
/// actually exists. Used by the readiness probe and at daemon startup.
pub async fn check_health(op: &Operator) -> Result<()> {
    op.check()
        .await
        .map_err(|e| anyhow::anyhow!("storage health check failed: {e}"))
}

/// Returns true if storage is reachable, false otherwise (non-panicking)
pub async fn is_healthy(op: &Operator) -> bool {
    check_health(op).await.is_ok()
}
