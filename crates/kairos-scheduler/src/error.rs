//! Scheduler error types

use kairos_bundler::BundlerError;
use kairos_primitives::{Address, Timestamp};
use kairos_storage::StorageError;
use kairos_types::{ChainId, TypeError};
use thiserror::Error;

/// Why a signature's validity window was rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// Signature too short or window prefix not hex
    #[error("malformed signature: {0}")]
    MalformedInput(String),

    /// `validUntil` already passed
    #[error("`validUntil` {valid_until} is in the past (expired at {now})")]
    Expired {
        /// Upper bound from the signature
        valid_until: Timestamp,
        /// Time of the check
        now: Timestamp,
    },

    /// `validUntil` is more than one calendar year away
    #[error("`validUntil` {valid_until} exceeds max one year period (limit {limit})")]
    WindowTooLong {
        /// Upper bound from the signature
        valid_until: Timestamp,
        /// Latest accepted upper bound
        limit: Timestamp,
    },

    /// `validUntil` does not come after `validAfter`
    #[error("`validUntil` {valid_until} must be later than `validAfter` {valid_after}")]
    InvertedWindow {
        /// Lower bound from the signature
        valid_after: Timestamp,
        /// Upper bound from the signature
        valid_until: Timestamp,
    },
}

/// Why an operation was refused or could not be handled at intake
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Only the v0.7 entry point is accepted
    #[error("invalid entry point {0}; only v0.7 is supported")]
    UnsupportedEntryPoint(Address),

    /// The scheduler does not poll this chain
    #[error("chain {0} is not served by this scheduler")]
    ChainNotPolled(ChainId),

    /// Operation fields are inconsistent
    #[error("invalid user operation: {0}")]
    InvalidOperation(#[from] TypeError),

    /// Window rejected
    #[error(transparent)]
    Window(#[from] WindowError),

    /// Immediate submission failed
    #[error("failed to execute user operation: {0}")]
    Execution(#[from] BundlerError),

    /// Deferred record could not be saved
    #[error("failed to save user operation: {0}")]
    Persistence(#[from] StorageError),
}

impl IntakeError {
    /// Whether the caller sent something we will never accept
    pub fn is_client_error(&self) -> bool {
        match self {
            IntakeError::UnsupportedEntryPoint(_)
            | IntakeError::ChainNotPolled(_)
            | IntakeError::InvalidOperation(_)
            | IntakeError::Window(_) => true,
            IntakeError::Persistence(StorageError::AlreadyExists(_)) => true,
            IntakeError::Execution(_) | IntakeError::Persistence(_) => false,
        }
    }
}

/// Result type for window extraction
pub type WindowResult<T> = Result<T, WindowError>;

/// Result type for intake
pub type IntakeResult<T> = Result<T, IntakeError>;
