//! Shared helpers for integration tests.
//!
//! - `log_capture`: capture tracing events and assert on them
//! - `upstream`: gateways wired to a wiremock server standing in for providers

pub mod log_capture;
pub mod upstream;
