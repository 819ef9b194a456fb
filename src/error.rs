//! Error types for delegation-core.
//!
//! Compilation-time errors (`MissingTokenId`, `InvalidAmount`) abort
//! delegation generation entirely: nothing unsafe is ever produced, and the
//! caller must not submit the wrapped transaction. Lifecycle-time failures
//! (`Store`) are best-effort cleanup and surface to whoever owns the
//! subscription rather than being retried here.

use alloy_primitives::Address;
use thiserror::Error;

/// Result type alias for delegation-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while compiling caveats, assembling redemption calldata,
/// or driving a delegation's lifecycle.
#[derive(Debug, Error)]
pub enum Error {
    /// An ERC-1155 balance change arrived without a token id. The whole
    /// build aborts: a partial delegation would under-constrain the call.
    #[error("ERC-1155 balance change for token {token} is missing a token id")]
    MissingTokenId {
        /// The token contract whose balance change lacked an id.
        token: Address,
    },

    /// A simulated balance difference could not be parsed as an unsigned
    /// decimal integer, or does not fit in 256 bits.
    #[error("invalid balance difference '{value}': not an unsigned 256-bit decimal")]
    InvalidAmount {
        /// The offending decimal string.
        value: String,
    },

    /// The delegation framework's calldata encoder (or its inverse) rejected
    /// the input. Propagated unchanged, never retried.
    #[error("redemption encoding failed: {0}")]
    Encoding(String),

    /// Environment configuration could not be parsed.
    #[error("invalid environment configuration: {0}")]
    Config(String),

    /// A delegation store mutation failed. Raised by store implementations,
    /// not by this crate; the lifecycle coordinator passes it through.
    #[error("delegation store error: {0}")]
    Store(String),
}

impl From<alloy_sol_types::Error> for Error {
    fn from(err: alloy_sol_types::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
