use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level daemon configuration (loaded from sealdrop.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealdropConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub records: RecordsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP listen address for the share API (default: 127.0.0.1:8320)
    pub listen: String,
    /// Prometheus metrics + health endpoint (default: 127.0.0.1:9311)
    pub metrics_addr: Option<String>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// Upload body cap in MiB (default: 512)
    pub max_payload_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Blob backend: "memory", "fs", or "s3"
    pub backend: String,
    /// Local root directory for the fs backend
    pub root: PathBuf,
    /// S3-compatible endpoint (SeaweedFS, MinIO, AWS)
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Enforce HTTPS for S3 connections (warn/error on HTTP endpoints)
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Share record database file (JSON, atomically rewritten on mutation)
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8320".into(),
            metrics_addr: Some("127.0.0.1:9311".into()),
            log_level: "info".into(),
            log_format: "text".into(),
            max_payload_mb: 512,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "fs".into(),
            root: PathBuf::from("/var/lib/sealdrop/blobs"),
            endpoint: "http://localhost:8333".into(),
            region: "us-east-1".into(),
            bucket: "sealdrop".into(),
            enforce_tls: false,
        }
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("/var/lib/sealdrop/records.json"),
        }
    }
}

impl ServerConfig {
    /// Body cap in bytes for the HTTP layer.
    pub fn max_payload_bytes(&self) -> usize {
        (self.max_payload_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[server]
listen = "0.0.0.0:8080"
metrics_addr = "0.0.0.0:9100"
log_level = "debug"
log_format = "json"
max_payload_mb = 64

[storage]
backend = "s3"
endpoint = "https://s3.example.com:8333"
region = "us-west-2"
bucket = "drops"
enforce_tls = true

[records]
db_path = "/srv/sealdrop/records.json"
"#;
        let config: SealdropConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.log_format, "json");
        assert_eq!(config.server.max_payload_mb, 64);
        assert_eq!(config.storage.backend, "s3");
        assert_eq!(config.storage.bucket, "drops");
        assert!(config.storage.enforce_tls);
        assert_eq!(
            config.records.db_path,
            PathBuf::from("/srv/sealdrop/records.json")
        );
    }

    #[test]
    fn test_parse_defaults() {
        let config: SealdropConfig = toml::from_str("").unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:8320");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.max_payload_mb, 512);
        assert_eq!(config.storage.backend, "fs");
        assert_eq!(config.storage.region, "us-east-1");
        assert!(!config.storage.enforce_tls);
        assert_eq!(
            config.records.db_path,
            PathBuf::from("/var/lib/sealdrop/records.json")
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[storage]
backend = "memory"
"#;
        let config: SealdropConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.storage.backend, "memory");
        // Defaults
        assert_eq!(config.storage.bucket, "sealdrop");
        assert_eq!(config.server.listen, "127.0.0.1:8320");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SealdropConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SealdropConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.listen, parsed.server.listen);
        assert_eq!(config.storage.endpoint, parsed.storage.endpoint);
        assert_eq!(config.records.db_path, parsed.records.db_path);
    }

    #[test]
    fn test_payload_cap_bytes() {
        let mut server = ServerConfig::default();
        server.max_payload_mb = 1;
        assert_eq!(server.max_payload_bytes(), 1024 * 1024);
    }
}
