//! Error types for newsroom.
//!
//! Uses `thiserror` for structured error types that map to HTTP statuses
//! at the inbound boundary and to exit codes in the CLI.
//!
//! ## Error Taxonomy
//!
//! - **Authorization**: a caller-supplied endpoint is not on the allow-list (403)
//! - **Configuration**: missing keys, unresolvable endpoints, bad input (400)
//! - **Provider**: every candidate attempt failed, or a provider answered badly (502)
//! - **Network**: timeouts and transport failures of a single attempt
//! - **Pipeline**: agent runs that could not proceed (claims, empty drafts)
//! - **Storage**: data store failures
//! - **Internal**: I/O, JSON and unclassified errors
//!
//! Each error has a stable error code (e.g., `NEWS-C001`) for programmatic handling.

use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller-supplied target rejected by the endpoint allow-list.
    Authorization,
    /// Missing setup or invalid input.
    Configuration,
    /// Provider-side failures after all candidates were tried.
    Provider,
    /// Timeouts and transport failures.
    Network,
    /// Agent pipeline failures.
    Pipeline,
    /// Data store failures.
    Storage,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Authorization => "Authorization error",
            Self::Configuration => "Configuration error",
            Self::Provider => "Provider error",
            Self::Network => "Network error",
            Self::Pipeline => "Pipeline error",
            Self::Storage => "Storage error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Authorization => "A",
            Self::Configuration => "C",
            Self::Provider => "P",
            Self::Network => "N",
            Self::Pipeline => "R",
            Self::Storage => "S",
            Self::Internal => "X",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Missing keys, bad config or bad input
    ConfigError = 2,
    /// Endpoint rejected by the allow-list
    Unauthorized = 3,
    /// Every provider attempt failed
    ProviderFailure = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as Self
    }
}

/// Main error type for newsroom operations.
#[derive(Error, Debug)]
pub enum NewsroomError {
    // ==========================================================================
    // Authorization errors
    // ==========================================================================
    /// A caller-supplied endpoint is not on the allow-list.
    #[error("Unauthorized endpoint provided: {endpoint}")]
    UnauthorizedEndpoint { endpoint: String },

    // ==========================================================================
    // Configuration errors
    // ==========================================================================
    /// No API key could be resolved for the provider.
    #[error("no keys configured for {provider}")]
    NoKeysConfigured { provider: String },

    /// Provider has no fixed endpoint and no usable override was given.
    #[error("no endpoint resolvable for {provider}")]
    EndpointUnresolvable { provider: String },

    /// Unknown provider identifier.
    #[error("invalid provider: {0}")]
    InvalidProvider(String),

    /// Malformed inbound request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    // ==========================================================================
    // Provider errors
    // ==========================================================================
    /// Every candidate attempt failed.
    #[error("all {attempts} provider attempt(s) failed: {last_error}")]
    AllAttemptsFailed { attempts: usize, last_error: String },

    /// Provider API returned a non-success status.
    #[error("provider {provider} returned HTTP {status_code}: {message}")]
    ProviderApiError {
        provider: String,
        status_code: u16,
        message: String,
    },

    /// Failed to parse provider response.
    #[error("failed to parse response: {0}")]
    ParseResponse(String),

    // ==========================================================================
    // Network errors
    // ==========================================================================
    /// Attempt exceeded its wall-clock budget.
    #[error("request timeout after {}ms", .0.as_millis())]
    Timeout(std::time::Duration),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    // ==========================================================================
    // Pipeline errors
    // ==========================================================================
    /// Requested agent does not exist or is not active.
    #[error("agent not found or not active: {0}")]
    AgentNotFound(String),

    /// Another run holds the agent's claim.
    #[error("agent {0} is already being run")]
    AgentBusy(String),

    /// Text generation produced no usable content.
    #[error("no content produced by {0}")]
    EmptyContent(String),

    // ==========================================================================
    // Storage errors
    // ==========================================================================
    /// Data store operation failed.
    #[error("store error: {0}")]
    Store(String),

    /// SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    // ==========================================================================
    // Internal errors
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure with context attached along the way (store migrations).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NewsroomError {
    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::UnauthorizedEndpoint { .. } => ErrorCategory::Authorization,

            Self::NoKeysConfigured { .. }
            | Self::EndpointUnresolvable { .. }
            | Self::InvalidProvider(_)
            | Self::InvalidRequest(_)
            | Self::Config(_) => ErrorCategory::Configuration,

            Self::AllAttemptsFailed { .. }
            | Self::ProviderApiError { .. }
            | Self::ParseResponse(_) => ErrorCategory::Provider,

            Self::Timeout(_) | Self::Network(_) => ErrorCategory::Network,

            Self::AgentNotFound(_) | Self::AgentBusy(_) | Self::EmptyContent(_) => {
                ErrorCategory::Pipeline
            }

            Self::Store(_) | Self::Database(_) => ErrorCategory::Storage,

            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnauthorizedEndpoint { .. } => "NEWS-A001",

            Self::NoKeysConfigured { .. } => "NEWS-C001",
            Self::EndpointUnresolvable { .. } => "NEWS-C002",
            Self::InvalidProvider(_) => "NEWS-C003",
            Self::InvalidRequest(_) => "NEWS-C004",
            Self::Config(_) => "NEWS-C010",

            Self::AllAttemptsFailed { .. } => "NEWS-P001",
            Self::ProviderApiError { .. } => "NEWS-P002",
            Self::ParseResponse(_) => "NEWS-P010",

            Self::Timeout(_) => "NEWS-N001",
            Self::Network(_) => "NEWS-N099",

            Self::AgentNotFound(_) => "NEWS-R001",
            Self::AgentBusy(_) => "NEWS-R002",
            Self::EmptyContent(_) => "NEWS-R003",

            Self::Store(_) => "NEWS-S001",
            Self::Database(_) => "NEWS-S002",

            Self::Io(_) => "NEWS-X001",
            Self::Json(_) => "NEWS-X002",
            Self::Other(_) => "NEWS-X099",
        }
    }

    /// HTTP status used when this error crosses the inbound HTTP boundary.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UnauthorizedEndpoint { .. } => 403,
            Self::NoKeysConfigured { .. }
            | Self::EndpointUnresolvable { .. }
            | Self::InvalidProvider(_)
            | Self::InvalidRequest(_)
            | Self::Config(_) => 400,
            Self::AgentNotFound(_) => 404,
            Self::AgentBusy(_) => 409,
            Self::AllAttemptsFailed { .. }
            | Self::ProviderApiError { .. }
            | Self::ParseResponse(_)
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::EmptyContent(_) => 502,
            Self::Store(_) | Self::Database(_) | Self::Io(_) | Self::Json(_) | Self::Other(_) => {
                500
            }
        }
    }

    /// Map error to a CLI exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self.category() {
            ErrorCategory::Authorization => ExitCode::Unauthorized,
            ErrorCategory::Configuration => ExitCode::ConfigError,
            ErrorCategory::Provider | ErrorCategory::Network => ExitCode::ProviderFailure,
            ErrorCategory::Pipeline | ErrorCategory::Storage | ErrorCategory::Internal => {
                ExitCode::GeneralError
            }
        }
    }

    /// Returns whether the error is potentially recoverable by retrying
    /// against another candidate or on a later scheduler pass.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_)
                | Self::Network(_)
                | Self::ProviderApiError { .. }
                | Self::ParseResponse(_)
                | Self::AllAttemptsFailed { .. }
                | Self::AgentBusy(_)
        )
    }
}

/// Result type alias using `NewsroomError`.
pub type Result<T> = std::result::Result<T, NewsroomError>;
