//! Type-level validation errors

use thiserror::Error;

/// Errors raised while building or validating core types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// Chain id is not one of the supported networks
    #[error("unsupported chain id: {0}")]
    UnsupportedChain(u64),

    /// Unknown chain name
    #[error("unknown chain name: {0}")]
    UnknownChainName(String),

    /// Gas field does not fit the 128-bit slot it is packed into
    #[error("{field} exceeds 128 bits")]
    GasFieldTooLarge {
        /// Name of the offending field
        field: &'static str,
    },

    /// Optional sub-fields given without their parent field
    #[error("inconsistent optional fields: {0}")]
    InconsistentFields(&'static str),

    /// Window bounds are not strictly ordered
    #[error("invalid window: valid_after {valid_after} >= valid_until {valid_until}")]
    InvalidWindow {
        /// Lower bound
        valid_after: u64,
        /// Upper bound
        valid_until: u64,
    },
}

/// Result type for type validation
pub type TypeResult<T> = Result<T, TypeError>;
