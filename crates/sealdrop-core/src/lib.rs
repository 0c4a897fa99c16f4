pub mod config;
pub mod types;

pub use config::SealdropConfig;
pub use types::{ConsumeOutcome, DenyReason, Grant, ShareId, SharePolicy, ShareRecord};
