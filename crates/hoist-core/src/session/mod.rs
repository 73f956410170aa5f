//! Upload session model.
//!
//! An [`UploadSession`] tracks one file's journey from initialization to
//! finalization: which chunks have arrived, and where the session sits in
//! its status state machine. The session owns all mutation of its receipt
//! set and status; stores provide only locking and durability around the
//! methods here.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Status of an upload session.
///
/// Status only advances forward. `Failed` is terminal and reachable from
/// any non-terminal state; `Finalized` is the successful terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session created, no chunks received yet
    Initialized,
    /// At least one chunk received, more outstanding
    InProgress,
    /// Every chunk received, finalize not yet run
    Complete,
    /// Finalize in flight
    Finalizing,
    /// Output artifact durably written, chunk records retired
    Finalized,
    /// Abandoned or administratively failed
    Failed,
}

impl SessionStatus {
    /// Whether the session has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }

    /// Whether the session can still accept chunk receipts.
    #[must_use]
    pub const fn accepts_chunks(self) -> bool {
        matches!(self, Self::Initialized | Self::InProgress | Self::Complete)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initialized => "initialized",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Finalizing => "finalizing",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Server-side record of one file upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    /// Unique session ID, assigned at initialization
    pub id: Uuid,
    /// Original file name
    pub filename: String,
    /// Bytes per chunk, fixed at initialization
    pub chunk_size: u64,
    /// Total number of chunks, fixed at initialization
    pub total_chunks: u32,
    /// Chunk numbers received so far (1-based, set semantics)
    pub received_chunks: BTreeSet<u32>,
    /// Current status
    pub status: SessionStatus,
    /// Path of the assembled output, set once finalized
    pub output_path: Option<PathBuf>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last touched
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    /// Create a new session in the `Initialized` state.
    #[must_use]
    pub fn new(filename: &str, total_chunks: u32, chunk_size: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            chunk_size,
            total_chunks,
            received_chunks: BTreeSet::new(),
            status: SessionStatus::Initialized,
            output_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record receipt of a chunk and recompute the status.
    ///
    /// Adding to the receipt set and deciding `Complete` happen in this
    /// single step; callers must invoke it under the store's per-session
    /// lock so concurrent receipts cannot race on the completion check.
    ///
    /// Returns `true` if the chunk was newly recorded, `false` if it had
    /// already been received (idempotent retry).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChunkOutOfRange`] for chunk numbers outside
    /// `[1, total_chunks]`, and [`Error::InvalidState`] once the session
    /// no longer accepts chunks.
    pub fn record_chunk(&mut self, chunk_number: u32) -> Result<bool> {
        if chunk_number == 0 || chunk_number > self.total_chunks {
            return Err(Error::ChunkOutOfRange {
                chunk: chunk_number,
                total_chunks: self.total_chunks,
            });
        }
        if !self.status.accepts_chunks() {
            return Err(Error::InvalidState {
                status: self.status,
            });
        }

        let newly_recorded = self.received_chunks.insert(chunk_number);

        self.status = if self.received_chunks.len() as u32 == self.total_chunks {
            SessionStatus::Complete
        } else {
            SessionStatus::InProgress
        };
        self.updated_at = Utc::now();

        Ok(newly_recorded)
    }

    /// Transition `Complete -> Finalizing`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is `Complete`.
    /// `Finalized` is not an error here; callers short-circuit on it
    /// before attempting the transition.
    pub fn begin_finalize(&mut self) -> Result<()> {
        if self.status != SessionStatus::Complete {
            return Err(Error::InvalidState {
                status: self.status,
            });
        }
        self.status = SessionStatus::Finalizing;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition `Finalizing -> Finalized`, caching the output path and
    /// clearing the receipt set (the chunk records are retired with it).
    pub fn complete_finalize(&mut self, output_path: PathBuf) {
        self.status = SessionStatus::Finalized;
        self.output_path = Some(output_path);
        self.received_chunks.clear();
        self.updated_at = Utc::now();
    }

    /// Roll `Finalizing` back to `Complete` after a failed assembly.
    ///
    /// Finalize must stay retryable: an I/O failure never advances the
    /// session past `Complete` and never marks it `Failed`.
    pub fn abort_finalize(&mut self) {
        if self.status == SessionStatus::Finalizing {
            self.status = SessionStatus::Complete;
            self.updated_at = Utc::now();
        }
    }

    /// Whether every chunk has been received.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received_chunks.len() as u32 == self.total_chunks
    }

    /// Chunk numbers in `[1, total_chunks]` not yet received, ascending.
    #[must_use]
    pub fn missing_chunks(&self) -> Vec<u32> {
        (1..=self.total_chunks)
            .filter(|n| !self.received_chunks.contains(n))
            .collect()
    }

    /// Produce a read-only snapshot for status queries.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            filename: self.filename.clone(),
            chunk_size: self.chunk_size,
            total_chunks: self.total_chunks,
            received_chunks: self.received_chunks.iter().copied().collect(),
            status: self.status,
            output_path: self.output_path.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only view of a session, served by status queries and used by the
/// client to reconcile on resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session ID
    pub id: Uuid,
    /// Original file name
    pub filename: String,
    /// Bytes per chunk
    pub chunk_size: u64,
    /// Total number of chunks
    pub total_chunks: u32,
    /// Chunk numbers received so far, ascending
    pub received_chunks: Vec<u32>,
    /// Current status
    pub status: SessionStatus,
    /// Path of the assembled output, if finalized
    pub output_path: Option<PathBuf>,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last touched
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Upload progress as a percentage (0.0 - 100.0).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_chunks == 0 {
            100.0
        } else {
            (self.received_chunks.len() as f64 / f64::from(self.total_chunks)) * 100.0
        }
    }

    /// Chunk numbers still outstanding, ascending.
    #[must_use]
    pub fn missing_chunks(&self) -> Vec<u32> {
        let received: BTreeSet<u32> = self.received_chunks.iter().copied().collect();
        (1..=self.total_chunks)
            .filter(|n| !received.contains(n))
            .collect()
    }
}

/// Acknowledgement returned for each received chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkAck {
    /// Session the chunk belongs to
    pub session_id: Uuid,
    /// The acknowledged chunk number
    pub chunk_number: u32,
    /// Whether this chunk had already been received (idempotent retry)
    pub already_received: bool,
    /// Number of chunks received so far
    pub received: u32,
    /// Total chunks in the session
    pub total_chunks: u32,
    /// Session status after this receipt
    pub status: SessionStatus,
}
