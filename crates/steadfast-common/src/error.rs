//! Error types shared across Steadfast crates.

use thiserror::Error;

/// Errors raised while encoding or decoding framed binary data.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data did not start with the expected magic bytes
    #[error("Invalid format: expected magic {expected:?}")]
    InvalidFormat {
        /// Expected magic bytes
        expected: [u8; 4],
    },

    /// Data is shorter than the frame header
    #[error("Truncated frame: {len} bytes")]
    Truncated {
        /// Number of bytes received
        len: usize,
    },

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Expected version
        expected: String,
        /// Actual version found
        actual: String,
    },

    /// Payload could not be decoded
    #[error("Corrupted payload: {0}")]
    Corrupted(String),
}

/// Result type alias for framed encoding operations.
pub type FrameResult<T> = Result<T, FrameError>;
