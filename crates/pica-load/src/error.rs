//! Load Errors

use crate::decode::DecodeError;

/// Errors surfaced to the request-orchestration layer.
///
/// Decode failures are routed to the error lifecycle path; they never escape
/// a delegate as a panic.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("request was cancelled")]
    Cancelled,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
