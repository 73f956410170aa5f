//! Error types for Hoist.
//!
//! This module provides a unified error type for all Hoist operations,
//! with specific error variants for different failure modes.

use std::io;

use thiserror::Error;

/// A specialized `Result` type for Hoist operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Hoist.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed arguments to an operation (E001)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown upload session (E002)
    #[error("upload session '{0}' not found")]
    SessionNotFound(uuid::Uuid),

    /// Chunk number outside the valid range (E003)
    #[error("chunk {chunk} out of range for session with {total_chunks} chunks")]
    ChunkOutOfRange {
        /// The offending chunk number
        chunk: u32,
        /// Total chunks in the session
        total_chunks: u32,
    },

    /// Operation not valid for the session's current status (E004)
    #[error("operation not valid while session is {status}")]
    InvalidState {
        /// The session status at the time of the call
        status: crate::session::SessionStatus,
    },

    /// Finalize found chunk records missing despite a complete receipt set (E005)
    #[error("upload incomplete: missing chunks {missing:?}")]
    IncompleteUpload {
        /// Chunk numbers with no stored record
        missing: Vec<u32>,
    },

    /// Local file no longer matches the server's session on resume (E006)
    #[error("resume mismatch: {0}")]
    ResumeMismatch(String),

    /// Underlying store failed (E007)
    #[error("storage failure: {0}")]
    Storage(String),

    /// Transport-level failure while talking to the server (E008)
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    /// The web binding uses them to pick HTTP status codes.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidArgument(_) => Some("E001"),
            Self::SessionNotFound(_) => Some("E002"),
            Self::ChunkOutOfRange { .. } => Some("E003"),
            Self::InvalidState { .. } => Some("E004"),
            Self::IncompleteUpload { .. } => Some("E005"),
            Self::ResumeMismatch(_) => Some("E006"),
            Self::Storage(_) => Some("E007"),
            Self::Transport(_) => Some("E008"),
            _ => None,
        }
    }

    /// Returns whether this error leaves the session resumable.
    ///
    /// A recoverable error aborts the current attempt but the session
    /// itself survives; the caller may reconcile and continue via resume.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Storage(_) | Self::Io(_)
        )
    }
}
