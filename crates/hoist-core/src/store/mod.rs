//! Session and chunk storage.
//!
//! Two backends ship with Hoist:
//!
//! - [`MemoryStore`] - everything in memory, for tests and embedded use
//! - [`DiskStore`] - JSON session records and chunk files on disk
//!
//! Both implement the [`SessionStore`] and [`ChunkStore`] traits, which
//! are the only seams the engine depends on. All mutation is scoped to a
//! single session key, so sessions are independent: stores guarantee
//! per-session atomicity and nothing across sessions.

pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::session::{SessionSnapshot, UploadSession};

/// Outcome of recording a chunk receipt.
#[derive(Debug, Clone)]
pub struct ChunkReceipt {
    /// Session state after the receipt
    pub snapshot: SessionSnapshot,
    /// `false` when the chunk had already been received (idempotent retry)
    pub newly_recorded: bool,
}

/// Durable record of upload sessions.
///
/// `record_chunk` and `begin_finalize` are the load-bearing operations:
/// each must be atomic per session, so that concurrent chunk receipts
/// never race on the completion check and concurrent finalize calls never
/// both assemble.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a newly initialized session.
    async fn create(&self, session: UploadSession) -> Result<()>;

    /// Fetch a session by ID, or `None` if unknown.
    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>>;

    /// Atomically add a chunk number to the receipt set and recompute the
    /// status. Receipt and completion check are one step; see
    /// [`UploadSession::record_chunk`] for the validation rules.
    async fn record_chunk(&self, id: Uuid, chunk_number: u32) -> Result<ChunkReceipt>;

    /// Atomically transition `Complete -> Finalizing` and return the
    /// updated session. An already `Finalized` session is returned as-is;
    /// callers check the returned status and short-circuit on it. Any
    /// other status is an `InvalidState` error.
    async fn begin_finalize(&self, id: Uuid) -> Result<UploadSession>;

    /// Mark the session `Finalized` with its output path, clearing the
    /// receipt set.
    async fn complete_finalize(&self, id: Uuid, output_path: &Path) -> Result<()>;

    /// Roll a `Finalizing` session back to `Complete` so finalize can be
    /// retried.
    async fn abort_finalize(&self, id: Uuid) -> Result<()>;

    /// Delete a session record entirely.
    async fn remove(&self, id: Uuid) -> Result<()>;

    /// All known sessions, most recently touched first.
    async fn list(&self) -> Result<Vec<UploadSession>>;
}

/// Durable keyed storage for chunk payloads.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Store a chunk payload. Re-putting the same `(session, chunk)` key
    /// overwrites in place; it never duplicates.
    async fn put_chunk(&self, session_id: Uuid, chunk_number: u32, payload: &[u8]) -> Result<()>;

    /// Read a chunk payload back, or `None` if that chunk was never
    /// stored.
    async fn get_chunk(&self, session_id: Uuid, chunk_number: u32) -> Result<Option<Vec<u8>>>;

    /// Delete every chunk stored for a session.
    async fn remove_chunks(&self, session_id: Uuid) -> Result<()>;
}
