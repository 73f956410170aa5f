//! Client-side transfer scheduler.
//!
//! The [`Uploader`] splits a file into fixed-size chunks and drives them
//! through an [`UploadTransport`] with bounded concurrency: a single
//! coordinating task owns the pending queue and the in-flight set, so no
//! counter or queue is ever mutated from two execution contexts. Chunk
//! completions free slots, update the watch-channel progress, and refill
//! the pool until the queue drains, at which point the scheduler asks the
//! server to finalize.
//!
//! The client holds no durable state. [`Uploader::resume`] reconciles
//! against the server's authoritative receipt set and sends only the
//! complement; that is the entire recovery story after a crash,
//! restart, or dropped connection.

pub mod transport;

pub use transport::{LocalTransport, UploadTransport};

#[cfg(feature = "http-client")]
pub use transport::HttpTransport;

use std::collections::VecDeque;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::SessionStatus;

/// Scheduler state as exposed through the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    /// Not started yet
    Preparing,
    /// Chunks in flight
    Uploading,
    /// All chunks sent, waiting on server-side assembly
    Finalizing,
    /// Output artifact produced
    Completed,
    /// The current attempt failed; the session remains resumable
    Failed,
}

/// Progress information for an upload.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    /// Current state
    pub state: UploadState,
    /// Session ID, once the session exists
    pub session_id: Option<Uuid>,
    /// Chunks confirmed by the server so far
    pub sent_chunks: u32,
    /// Total number of chunks
    pub total_chunks: u32,
    /// Bytes confirmed so far
    pub bytes_sent: u64,
    /// Total bytes in the file
    pub total_bytes: u64,
}

impl UploadProgress {
    fn idle() -> Self {
        Self {
            state: UploadState::Preparing,
            session_id: None,
            sent_chunks: 0,
            total_chunks: 0,
            bytes_sent: 0,
            total_bytes: 0,
        }
    }

    /// Upload progress as a percentage (0.0 - 100.0).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            (f64::from(self.sent_chunks) / f64::from(self.total_chunks)) * 100.0
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// The session that carried the upload
    pub session_id: Uuid,
    /// Where the server wrote the assembled file
    pub output_path: PathBuf,
    /// Number of chunks transferred
    pub total_chunks: u32,
}

/// Configuration for the transfer scheduler.
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Bytes per chunk
    pub chunk_size: u64,
    /// Maximum chunk sends in flight at once
    pub concurrency: usize,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: crate::DEFAULT_CHUNK_SIZE,
            concurrency: crate::DEFAULT_CONCURRENT_UPLOADS,
        }
    }
}

/// Concurrency-bounded chunk upload scheduler.
pub struct Uploader<T: UploadTransport + 'static> {
    transport: Arc<T>,
    config: UploaderConfig,
    progress_tx: watch::Sender<UploadProgress>,
    progress_rx: watch::Receiver<UploadProgress>,
}

impl<T: UploadTransport + 'static> std::fmt::Debug for Uploader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: UploadTransport + 'static> Uploader<T> {
    /// Create a scheduler over a transport.
    #[must_use]
    pub fn new(transport: T, config: UploaderConfig) -> Self {
        let (progress_tx, progress_rx) = watch::channel(UploadProgress::idle());
        Self {
            transport: Arc::new(transport),
            config,
            progress_tx,
            progress_rx,
        }
    }

    /// Get a progress receiver.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress_rx.clone()
    }

    /// Upload a file from scratch: initialize a session, send every
    /// chunk, then finalize.
    ///
    /// # Errors
    ///
    /// Any transport or engine error fails the attempt. The session (if
    /// one was created) survives and can be continued with
    /// [`Uploader::resume`].
    pub async fn upload(&self, path: &Path) -> Result<UploadOutcome> {
        let file_size = fs::metadata(path).await?.len();
        if file_size == 0 {
            return Err(Error::InvalidArgument(
                "cannot upload an empty file".to_string(),
            ));
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidArgument(format!("path '{}' has no file name", path.display()))
            })?;

        let chunk_size = self.config.chunk_size;
        let total_chunks = chunk_count(file_size, chunk_size)?;

        let session_id = self
            .transport
            .initialize(filename, total_chunks, chunk_size)
            .await?;
        tracing::info!(
            session_id = %session_id,
            filename,
            total_chunks,
            "starting upload"
        );

        self.set_progress(UploadProgress {
            state: UploadState::Uploading,
            session_id: Some(session_id),
            sent_chunks: 0,
            total_chunks,
            bytes_sent: 0,
            total_bytes: file_size,
        });

        let pending: VecDeque<u32> = (1..=total_chunks).collect();
        self.drain(session_id, path, file_size, chunk_size, total_chunks, pending)
            .await?;
        self.finish(session_id, total_chunks).await
    }

    /// Reconcile an interrupted upload against the server and continue.
    ///
    /// The server's view always wins: chunk size and receipt set come
    /// from its status response, and only the complement is sent.
    ///
    /// # Errors
    ///
    /// [`Error::ResumeMismatch`] when the local file no longer fits the
    /// session's chunk arithmetic, plus anything [`Uploader::upload`]
    /// can return.
    pub async fn resume(&self, session_id: Uuid, path: &Path) -> Result<UploadOutcome> {
        let snapshot = self.transport.status(session_id).await?;

        if snapshot.status == SessionStatus::Finalized {
            // nothing left to send; finalize just hands back the cached
            // output path
            return self.finish(session_id, snapshot.total_chunks).await;
        }

        let file_size = fs::metadata(path).await?.len();
        let chunk_size = snapshot.chunk_size;
        let expected_chunks = chunk_count(file_size, chunk_size)?;
        if expected_chunks != snapshot.total_chunks {
            return Err(Error::ResumeMismatch(format!(
                "file splits into {expected_chunks} chunks of {chunk_size} bytes, session expects {}",
                snapshot.total_chunks
            )));
        }

        let done = snapshot.received_chunks.len() as u32;
        let bytes_done: u64 = snapshot
            .received_chunks
            .iter()
            .map(|&n| chunk_len(n, snapshot.total_chunks, chunk_size, file_size))
            .sum();
        let pending: VecDeque<u32> = snapshot.missing_chunks().into();

        tracing::info!(
            session_id = %session_id,
            done,
            remaining = pending.len(),
            "resuming upload"
        );

        self.set_progress(UploadProgress {
            state: UploadState::Uploading,
            session_id: Some(session_id),
            sent_chunks: done,
            total_chunks: snapshot.total_chunks,
            bytes_sent: bytes_done,
            total_bytes: file_size,
        });

        self.drain(
            session_id,
            path,
            file_size,
            chunk_size,
            snapshot.total_chunks,
            pending,
        )
        .await?;
        self.finish(session_id, snapshot.total_chunks).await
    }

    /// The bounded drain loop. Runs on the calling task; worker tasks
    /// only read file ranges and push bytes through the transport.
    async fn drain(
        &self,
        session_id: Uuid,
        path: &Path,
        file_size: u64,
        chunk_size: u64,
        total_chunks: u32,
        mut pending: VecDeque<u32>,
    ) -> Result<()> {
        let mut in_flight: JoinSet<Result<u32>> = JoinSet::new();

        loop {
            while in_flight.len() < self.config.concurrency {
                let Some(chunk_number) = pending.pop_front() else {
                    break;
                };
                let transport = Arc::clone(&self.transport);
                let path = path.to_path_buf();
                let len = chunk_len(chunk_number, total_chunks, chunk_size, file_size);

                in_flight.spawn(async move {
                    let payload = read_chunk(&path, chunk_number, chunk_size, len).await?;
                    transport.send_chunk(session_id, chunk_number, payload).await?;
                    Ok(chunk_number)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let chunk_number = match joined {
                Ok(Ok(chunk_number)) => chunk_number,
                Ok(Err(e)) => {
                    in_flight.abort_all();
                    self.mark_failed();
                    return Err(e);
                }
                Err(e) => {
                    in_flight.abort_all();
                    self.mark_failed();
                    return Err(Error::Transport(format!("chunk send task failed: {e}")));
                }
            };

            let done_len = chunk_len(chunk_number, total_chunks, chunk_size, file_size);
            self.update_progress(|progress| {
                progress.sent_chunks += 1;
                progress.bytes_sent += done_len;
            });
            tracing::debug!(
                session_id = %session_id,
                chunk = chunk_number,
                "chunk acknowledged"
            );
        }

        Ok(())
    }

    /// All chunks confirmed: request assembly and report completion.
    async fn finish(&self, session_id: Uuid, total_chunks: u32) -> Result<UploadOutcome> {
        self.update_progress(|progress| progress.state = UploadState::Finalizing);

        let output_path = match self.transport.finalize(session_id).await {
            Ok(path) => path,
            Err(e) => {
                self.mark_failed();
                return Err(e);
            }
        };

        self.update_progress(|progress| {
            progress.state = UploadState::Completed;
            progress.sent_chunks = progress.total_chunks;
            progress.bytes_sent = progress.total_bytes;
        });
        tracing::info!(
            session_id = %session_id,
            output = %output_path.display(),
            "upload complete"
        );

        Ok(UploadOutcome {
            session_id,
            output_path,
            total_chunks,
        })
    }

    fn set_progress(&self, progress: UploadProgress) {
        let _ = self.progress_tx.send(progress);
    }

    fn update_progress(&self, mutate: impl FnOnce(&mut UploadProgress)) {
        let mut progress = self.progress_rx.borrow().clone();
        mutate(&mut progress);
        let _ = self.progress_tx.send(progress);
    }

    fn mark_failed(&self) {
        self.update_progress(|progress| progress.state = UploadState::Failed);
    }
}

/// Number of chunks a file of `file_size` bytes splits into.
fn chunk_count(file_size: u64, chunk_size: u64) -> Result<u32> {
    let count = file_size.div_ceil(chunk_size);
    u32::try_from(count).map_err(|_| {
        Error::InvalidArgument(format!(
            "file needs {count} chunks; raise the chunk size"
        ))
    })
}

/// Length of chunk `n` given the file and chunk sizes.
fn chunk_len(chunk_number: u32, total_chunks: u32, chunk_size: u64, file_size: u64) -> u64 {
    if chunk_number == total_chunks {
        file_size - u64::from(total_chunks - 1) * chunk_size
    } else {
        chunk_size
    }
}

/// Read the byte range for one chunk. Each read opens its own handle so
/// concurrent sends never contend on a shared seek position.
async fn read_chunk(path: &Path, chunk_number: u32, chunk_size: u64, len: u64) -> Result<Vec<u8>> {
    let mut file = fs::File::open(path).await?;
    file.seek(SeekFrom::Start(u64::from(chunk_number - 1) * chunk_size))
        .await?;

    #[allow(clippy::cast_possible_truncation)]
    let mut payload = vec![0u8; len as usize];
    file.read_exact(&mut payload).await?;
    Ok(payload)
}
