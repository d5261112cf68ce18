//! Error types for the transform core.

use thiserror::Error;

/// Contract violations reported by stacks, frusta, frames and the pipeline.
///
/// Every variant is local and recoverable: the operation that returned it
/// left its receiver unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// Malformed parameters, e.g. a frustum with `far <= near`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A push would exceed the stack's configured maximum depth.
    #[error("matrix stack overflow: maximum depth {max_depth} reached")]
    StackOverflow { max_depth: usize },

    /// A pop was attempted with only the base entry left.
    #[error("matrix stack underflow: the base entry cannot be popped")]
    StackUnderflow,

    /// The operation is not valid for this value, e.g. a rigid inverse of a
    /// scaled matrix.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The pipeline was read before both of its stacks were bound, or a bound
    /// stack has since been dropped.
    #[error("transform pipeline is not bound to live matrix stacks")]
    NotBound,
}

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, TransformError>;
