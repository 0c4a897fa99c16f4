//! Share-link codec
//!
//! `<server>/download/{id}#<token>` — the id goes to the server, the token
//! after `#` never does. Everything here manipulates the link as text; the
//! token itself is decoded by `sealdrop_crypto::decode_secret`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("share link has no #secret fragment — without it the file cannot be decrypted")]
    MissingFragment,

    #[error("share link has no share id in its path")]
    MissingId,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedLink {
    /// Server base URL, e.g. `https://drop.example.com`
    pub server: String,
    pub id: String,
    /// The fragment secret token, still encoded.
    pub token: String,
}

/// Assemble a share link.
pub fn build_link(server: &str, id: &str, token: &str) -> String {
    format!("{}/download/{id}#{token}", server.trim_end_matches('/'))
}

/// Take a share link apart. Accepts both the `/download/{id}` form the
/// sender hands out and a bare `{server}/{id}` form.
pub fn parse_link(link: &str) -> Result<ParsedLink, LinkError> {
    let (url, token) = link.split_once('#').ok_or(LinkError::MissingFragment)?;
    if token.is_empty() {
        return Err(LinkError::MissingFragment);
    }

    let (base, id) = url.rsplit_once('/').ok_or(LinkError::MissingId)?;
    if id.is_empty() || base.is_empty() {
        return Err(LinkError::MissingId);
    }

    let server = base.strip_suffix("/download").unwrap_or(base).to_string();

    Ok(ParsedLink {
        server,
        id: id.to_string(),
        token: token.to_string(),
    })
}
