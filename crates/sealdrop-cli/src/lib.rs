//! sealdrop client library: share-link codec and the HTTP API client.
//!
//! The binary (`main.rs`) wires these into the `send` / `fetch` commands;
//! they live in the library so the wiremock integration tests can drive
//! them without a terminal.

pub mod client;
pub mod link;

pub use client::{safe_output_name, ApiClient, ClientError};
pub use link::{build_link, parse_link, ParsedLink};
