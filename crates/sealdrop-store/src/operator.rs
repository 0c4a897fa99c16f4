//! OpenDAL Operator factory for sealdrop storage backends

use anyhow::{Context, Result};
use opendal::Operator;
use sealdrop_core::config::StorageConfig;

/// Build an OpenDAL Operator for the configured backend.
///
/// S3 credentials come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
/// rather than the config file, so the config can be world-readable.
/// Path-style addressing (the opendal 0.55 default) is required by
/// SeaweedFS and MinIO — do NOT enable virtual-host style for these.
pub fn build_operator(cfg: &StorageConfig) -> Result<Operator> {
    let op = match cfg.backend.as_str() {
        "memory" => Operator::new(opendal::services::Memory::default())
            .context("creating OpenDAL memory operator")?
            .finish(),

        "fs" => {
            let builder = opendal::services::Fs::default().root(&cfg.root.to_string_lossy());
            Operator::new(builder)
                .context("creating OpenDAL fs operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .finish()
        }

        "s3" => {
            check_endpoint_tls(cfg)?;

            let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
                .context("s3 backend requires AWS_ACCESS_KEY_ID in the environment")?;
            let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
                .context("s3 backend requires AWS_SECRET_ACCESS_KEY in the environment")?;

            let builder = opendal::services::S3::default()
                .endpoint(&cfg.endpoint)
                .region(&cfg.region)
                .bucket(&cfg.bucket)
                .access_key_id(&access_key_id)
                .secret_access_key(&secret_access_key);

            Operator::new(builder)
                .context("creating OpenDAL S3 operator")?
                .layer(opendal::layers::LoggingLayer::default())
                .layer(
                    opendal::layers::RetryLayer::new()
                        .with_max_times(5)
                        .with_jitter(),
                )
                .finish()
        }

        other => anyhow::bail!("unknown storage backend: {other} (expected memory, fs, or s3)"),
    };

    Ok(op)
}

/// If `enforce_tls` is set and the endpoint uses HTTP, this returns an error.
/// Otherwise a warning is logged for non-HTTPS endpoints.
fn check_endpoint_tls(cfg: &StorageConfig) -> Result<()> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "S3 endpoint uses plaintext HTTP — ciphertext is opaque but credentials are not. \
             Set storage.enforce_tls = true and use HTTPS in production."
        );
    }
    Ok(())
}
