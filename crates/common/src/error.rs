//! Common error types for streamer components.

use thiserror::Error;

/// Errors raised while interpreting values handed over by the conferencing
/// transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// An identifier issued by the transport was empty.
    #[error("Empty identifier: {0}")]
    EmptyIdentifier(&'static str),
}

/// Result type alias using `CommonError`
pub type Result<T> = std::result::Result<T, CommonError>;
