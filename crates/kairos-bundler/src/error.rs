//! Execution client error types

use kairos_types::ChainId;
use thiserror::Error;

/// Errors from submitting or estimating an operation
#[derive(Debug, Error)]
pub enum BundlerError {
    /// Transport/network error
    #[error("transport error: {0}")]
    Transport(String),

    /// JSON-RPC error returned by the bundler
    #[error("rpc error: {code} - {message}")]
    Rpc {
        /// Error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Response body could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No bundler endpoint is configured for the chain
    #[error("no bundler endpoint for {0}")]
    NoEndpoint(ChainId),

    /// Well-formed response that does not carry what was asked for
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Scripted failure from the mock client
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for BundlerError {
    fn from(e: serde_json::Error) -> Self {
        BundlerError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for BundlerError {
    fn from(e: reqwest::Error) -> Self {
        BundlerError::Transport(e.to_string())
    }
}

/// Result type for execution client calls
pub type BundlerResult<T> = Result<T, BundlerError>;
