//! sealdropd library surface: the HTTP router and metrics endpoints.
//!
//! Split out of the binary so the API can be driven in-process by the
//! integration tests (tower `oneshot` against the router, no socket).

pub mod http;
pub mod metrics;
