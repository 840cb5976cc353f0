//! HTTP client construction.
//!
//! One `reqwest` client is shared by every dispatcher attempt.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::error::{NewsroomError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a configured HTTP client.
///
/// The client timeout is a backstop; the dispatcher enforces the
/// per-attempt budget itself.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(format!("newsroom/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| NewsroomError::Network(e.to_string()))
}

/// Client with the default timeout.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}
