//! Error taxonomy for remote conversation access.
//!
//! Strongly-typed failures so callers can distinguish what must be surfaced
//! (authentication), what the gateway retries internally (rate limits), and
//! what the sync engine simply swallows (transient network failures).

use thiserror::Error;

/// Failure from the conversation gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Credential rejected by the remote service. Never retried; the caller
    /// must force re-authentication.
    #[error("authentication rejected by the conversation service")]
    Auth,

    /// Rate limit still in effect after bounded retries.
    #[error("rate limited after {attempts} attempts")]
    RateLimited {
        /// Total attempts made, including the initial request.
        attempts: u32,
    },

    /// Transport-level failure (connect, timeout, non-2xx status).
    #[error("http failure: {0}")]
    Http(String),

    /// Response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Request rejected locally before any remote call.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl GatewayError {
    /// Returns true if this failure may succeed on a later attempt.
    ///
    /// Authentication and validation failures are never transient: retrying
    /// them without operator action cannot help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Http(_))
    }
}
