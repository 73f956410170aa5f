//! Server-side session engine.
//!
//! The [`SessionEngine`] owns the upload lifecycle: it creates sessions,
//! records chunk receipts idempotently, detects completion, and performs
//! exactly-once ordered reassembly. It is transport-agnostic; the web
//! binding and the in-process transport both sit on top of the four
//! operations here.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{ChunkAck, SessionSnapshot, SessionStatus, UploadSession};
use crate::store::{ChunkStore, DiskStore, MemoryStore, SessionStore};

/// The server-side upload engine.
///
/// Cheap to clone; clones share the same stores.
#[derive(Clone)]
pub struct SessionEngine {
    sessions: Arc<dyn SessionStore>,
    chunks: Arc<dyn ChunkStore>,
    output_dir: PathBuf,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    /// Create an engine over explicit store implementations.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        chunks: Arc<dyn ChunkStore>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sessions,
            chunks,
            output_dir: output_dir.into(),
        }
    }

    /// Create an engine backed entirely by memory.
    #[must_use]
    pub fn in_memory(output_dir: impl Into<PathBuf>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, output_dir)
    }

    /// Create an engine backed by a [`DiskStore`] rooted at `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directories cannot be created.
    pub async fn on_disk(
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let store = Arc::new(DiskStore::open(data_dir).await?);
        Ok(Self::new(store.clone(), store, output_dir))
    }

    /// Directory finalized files are written to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create a new upload session and return its ID.
    ///
    /// The returned ID is the actual store key; every subsequent
    /// operation uses it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a zero chunk count or
    /// chunk size, or a filename that is not a bare file name.
    pub async fn initialize(
        &self,
        filename: &str,
        total_chunks: u32,
        chunk_size: u64,
    ) -> Result<Uuid> {
        if total_chunks == 0 {
            return Err(Error::InvalidArgument(
                "total_chunks must be at least 1".to_string(),
            ));
        }
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk_size must be at least 1 byte".to_string(),
            ));
        }
        let filename = sanitize_filename(filename)?;

        let session = UploadSession::new(filename, total_chunks, chunk_size);
        let id = session.id;
        self.sessions.create(session).await?;

        tracing::info!(
            session_id = %id,
            filename,
            total_chunks,
            chunk_size,
            "initialized upload session"
        );
        Ok(id)
    }

    /// Record receipt of one chunk.
    ///
    /// Storing the payload and recording the receipt are idempotent:
    /// re-sending an already-received chunk overwrites the payload in
    /// place and acks with `already_received = true`. The receipt and the
    /// completion check happen in one atomic store operation.
    ///
    /// # Errors
    ///
    /// `SessionNotFound`, `ChunkOutOfRange`, `InvalidState` per the
    /// protocol, plus `InvalidArgument` when the payload length does not
    /// match the session's chunk size (the final chunk may be short, but
    /// never empty or oversized).
    pub async fn receive_chunk(
        &self,
        id: Uuid,
        chunk_number: u32,
        payload: &[u8],
    ) -> Result<ChunkAck> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or(Error::SessionNotFound(id))?;

        if chunk_number == 0 || chunk_number > session.total_chunks {
            return Err(Error::ChunkOutOfRange {
                chunk: chunk_number,
                total_chunks: session.total_chunks,
            });
        }
        if !session.status.accepts_chunks() {
            return Err(Error::InvalidState {
                status: session.status,
            });
        }
        validate_payload_len(&session, chunk_number, payload.len() as u64)?;

        // Payload first, receipt second: a receipt without a stored
        // payload would defeat the finalize integrity guard. The store
        // re-validates status under its lock, so a finalize racing past
        // the check above cannot be followed by a stray receipt.
        self.chunks.put_chunk(id, chunk_number, payload).await?;
        let receipt = self.sessions.record_chunk(id, chunk_number).await?;

        tracing::debug!(
            session_id = %id,
            chunk = chunk_number,
            already_received = !receipt.newly_recorded,
            received = receipt.snapshot.received_chunks.len(),
            total = receipt.snapshot.total_chunks,
            "chunk received"
        );
        if receipt.snapshot.status == SessionStatus::Complete {
            tracing::info!(session_id = %id, "all chunks received");
        }

        Ok(ChunkAck {
            session_id: id,
            chunk_number,
            already_received: !receipt.newly_recorded,
            received: receipt.snapshot.received_chunks.len() as u32,
            total_chunks: receipt.snapshot.total_chunks,
            status: receipt.snapshot.status,
        })
    }

    /// Assemble the received chunks into the output file, exactly once.
    ///
    /// Chunks are concatenated in ascending chunk-number order into
    /// `<output_dir>/<filename>`, written atomically. On success the
    /// chunk records are retired and the session is marked `Finalized`
    /// with the output path cached; calling finalize again returns that
    /// path without redoing any work. On failure the session is left
    /// `Complete` so finalize can be retried.
    ///
    /// # Errors
    ///
    /// `SessionNotFound`; `InvalidState` unless the session is
    /// `Complete` or `Finalized`; `IncompleteUpload` if any chunk record
    /// is missing despite the receipt set claiming completion.
    pub async fn finalize(&self, id: Uuid) -> Result<PathBuf> {
        let session = self.sessions.begin_finalize(id).await?;

        if session.status == SessionStatus::Finalized {
            return session
                .output_path
                .ok_or_else(|| Error::Storage("finalized session has no output path".to_string()));
        }

        match self.assemble(&session).await {
            Ok(output_path) => {
                self.sessions.complete_finalize(id, &output_path).await?;
                if let Err(e) = self.chunks.remove_chunks(id).await {
                    // The artifact is durable and the session is
                    // finalized; leftover chunk files are only garbage.
                    tracing::warn!(session_id = %id, error = %e, "failed to retire chunk records");
                }
                tracing::info!(
                    session_id = %id,
                    output = %output_path.display(),
                    "upload finalized"
                );
                Ok(output_path)
            }
            Err(e) => {
                if let Err(abort_err) = self.sessions.abort_finalize(id).await {
                    tracing::warn!(session_id = %id, error = %abort_err, "failed to roll back finalize");
                }
                tracing::warn!(session_id = %id, error = %e, "finalize failed, session stays retryable");
                Err(e)
            }
        }
    }

    /// Read-only status snapshot, used by clients to reconcile on resume.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] for an unknown session.
    pub async fn status(&self, id: Uuid) -> Result<SessionSnapshot> {
        let session = self
            .sessions
            .get(id)
            .await?
            .ok_or(Error::SessionNotFound(id))?;
        Ok(session.snapshot())
    }

    /// All known sessions, most recently touched first.
    pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
        let sessions = self.sessions.list().await?;
        Ok(sessions.iter().map(UploadSession::snapshot).collect())
    }

    /// Remove non-finalized sessions idle for longer than `max_age`,
    /// along with their chunk records. Returns how many were removed.
    pub async fn sweep_stale(&self, max_age: chrono::Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now() - max_age;
        let mut swept = 0;

        for session in self.sessions.list().await? {
            if session.status == SessionStatus::Finalized || session.updated_at >= cutoff {
                continue;
            }
            self.chunks.remove_chunks(session.id).await?;
            self.sessions.remove(session.id).await?;
            tracing::debug!(
                session_id = %session.id,
                status = %session.status,
                "swept stale session"
            );
            swept += 1;
        }

        if swept > 0 {
            tracing::info!(count = swept, "swept stale upload sessions");
        }
        Ok(swept)
    }

    /// Write the ordered chunk payloads to the output file via a temp
    /// file, verifying that every chunk record exists.
    async fn assemble(&self, session: &UploadSession) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).await?;

        let output_path = self.output_dir.join(&session.filename);
        let temp_path = self.output_dir.join(format!(".{}.partial", session.id));

        let result = self
            .write_chunks(session, &temp_path, &output_path)
            .await;
        if result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        result
    }

    async fn write_chunks(
        &self,
        session: &UploadSession,
        temp_path: &Path,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let mut missing = Vec::new();
        let mut file = fs::File::create(temp_path).await?;

        for chunk_number in 1..=session.total_chunks {
            match self.chunks.get_chunk(session.id, chunk_number).await? {
                Some(payload) if missing.is_empty() => file.write_all(&payload).await?,
                Some(_) => {}
                None => missing.push(chunk_number),
            }
        }

        if !missing.is_empty() {
            return Err(Error::IncompleteUpload { missing });
        }

        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, output_path).await?;

        Ok(output_path.to_path_buf())
    }
}

/// Reject filenames that could escape the output directory.
fn sanitize_filename(filename: &str) -> Result<&str> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(Error::InvalidArgument(format!(
            "filename must be a bare file name, got '{filename}'"
        ))),
    }
}

fn validate_payload_len(session: &UploadSession, chunk_number: u32, len: u64) -> Result<()> {
    let valid = if chunk_number == session.total_chunks {
        (1..=session.chunk_size).contains(&len)
    } else {
        len == session.chunk_size
    };
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "chunk {chunk_number} payload is {len} bytes, expected {} (final chunk may be short)",
            session.chunk_size
        )))
    }
}
