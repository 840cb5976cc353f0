//! Utility functions.

pub mod format;
pub mod time;

pub use format::{format_duration_ms, truncate};
pub use time::{format_countdown, format_relative_time};
