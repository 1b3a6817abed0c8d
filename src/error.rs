//! Error types for the bender core.
//!
//! Every fallible operation in the library returns [`Result`], whose error
//! side is [`BenderError`]. The CLI wraps these in `anyhow` for context.

use std::time::Duration;

use thiserror::Error;

/// HTTP status the completion service uses to signal rate limiting.
pub const RATE_LIMIT_STATUS: u16 = 429;

/// Errors produced by the prompt/cache/completion core.
#[derive(Debug, Error)]
pub enum BenderError {
    /// Caller input was rejected before any state change (e.g. blank prompt).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network or I/O failure while talking to the completion service.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The completion service answered with a non-success status.
    #[error("Protocol failure (HTTP {status}): {message}")]
    Protocol { status: u16, message: String },

    /// The response body was not the expected completion envelope.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Appending to or loading the conversation log failed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// A retry backoff was interrupted by the caller.
    #[error("Retry interrupted")]
    Cancelled,

    /// The overall deadline across all retry attempts elapsed.
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BenderError {
    /// True for protocol failures the service uses to signal rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Protocol { status, .. } if *status == RATE_LIMIT_STATUS)
    }

    /// Short hint shown under the error message on user-facing surfaces.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Validation(_) => Some("Please enter a valid prompt."),
            Self::Transport(_) => Some("Check your network connection and the service URL."),
            Self::Protocol { status: 401, .. } | Self::Protocol { status: 403, .. } => {
                Some("Check that OPENAI_API_KEY is set to a valid key.")
            }
            Self::Protocol { status, .. } if *status == RATE_LIMIT_STATUS => {
                Some("The service is rate limiting requests; try again shortly.")
            }
            Self::Config(_) => Some("See ~/.bender/config.toml or the BENDER_* environment variables."),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BenderError>;
