//! HTTP client for the sealdrop share API
//!
//! Thin reqwest wrapper that maps the server's status-code contract onto
//! typed results so the commands can print distinct, useful messages.
//! Only ciphertext ever crosses this boundary.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// 404 — unknown id, or a share already purged (used up or swept).
    #[error("share not found — the link may have already been used up")]
    NotFound,

    /// 410 — expired or download limit reached; terminal either way.
    #[error("share is gone — it expired or reached its download limit")]
    Gone,

    /// 401 — retryable by the user with the right password.
    #[error("password required or incorrect")]
    BadPassword,

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error("server error: HTTP {0}")]
    Server(StatusCode),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// A downloaded ciphertext plus the server-reported display name.
#[derive(Debug)]
pub struct FetchedShare {
    pub ciphertext: Vec<u8>,
    pub original_name: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Upload sealed bytes with their access policy; returns the share id.
    pub async fn upload(
        &self,
        ciphertext: Vec<u8>,
        expires_at: DateTime<Utc>,
        max_downloads: u32,
        password_hash: Option<&str>,
        filename: &str,
    ) -> Result<String, ClientError> {
        let url = format!("{}/share", self.base);

        let mut query: Vec<(&str, String)> = vec![
            (
                "expires_at",
                expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("max_downloads", max_downloads.to_string()),
            ("filename", filename.to_string()),
        ];
        if let Some(digest) = password_hash {
            query.push(("password_hash", digest.to_string()));
        }

        let response = self
            .http
            .post(&url)
            .query(&query)
            .body(ciphertext)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<UploadResponse>().await?.id),
            StatusCode::BAD_REQUEST => {
                let message = response
                    .json::<ErrorResponse>()
                    .await
                    .map(|e| e.error)
                    .unwrap_or_else(|_| "bad request".into());
                Err(ClientError::Rejected(message))
            }
            status => Err(ClientError::Server(status)),
        }
    }

    /// Download a share's ciphertext by id.
    pub async fn download(
        &self,
        id: &str,
        password_hash: Option<&str>,
    ) -> Result<FetchedShare, ClientError> {
        let url = format!("{}/share/{id}", self.base);

        let mut request = self.http.get(&url);
        if let Some(digest) = password_hash {
            request = request.query(&[("password_hash", digest)]);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::OK => {
                let original_name = response
                    .headers()
                    .get("content-disposition")
                    .and_then(|v| v.to_str().ok())
                    .and_then(disposition_filename);
                let ciphertext = response.bytes().await?.to_vec();
                Ok(FetchedShare {
                    ciphertext,
                    original_name,
                })
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            StatusCode::GONE => Err(ClientError::Gone),
            StatusCode::UNAUTHORIZED => Err(ClientError::BadPassword),
            status => Err(ClientError::Server(status)),
        }
    }
}

/// Pull the quoted filename out of a `Content-Disposition` header value.
fn disposition_filename(value: &str) -> Option<String> {
    let start = value.find("filename=\"")? + "filename=\"".len();
    let rest = &value[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Reduce a server-reported name to a bare filename. The server controls
/// this string, so path separators and dot-dot segments must not survive
/// into a local write path.
pub fn safe_output_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "file".into()
    } else {
        base.to_string()
    }
}
