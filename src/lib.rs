//! newsroom - multi-provider LLM routing for a blogging platform
//!
//! Routes generation calls across Gemini keys, models and API versions with
//! per-attempt diagnostics, guards caller-supplied endpoints with a host
//! allow-list, rotates research across secondary providers and runs
//! scheduled journalist agents that publish articles to a record store.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod agents;
pub mod cli;
pub mod core;
pub mod error;
pub mod render;
pub mod server;
pub mod storage;
pub mod util;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ExitCode, NewsroomError, Result};
