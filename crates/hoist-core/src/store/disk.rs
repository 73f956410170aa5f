//! Disk-backed store.
//!
//! Session records are stored as pretty-printed JSON, one file per
//! session, written atomically (temp file, fsync, rename). Chunk payloads
//! are stored as one file per chunk number under a per-session directory:
//!
//! ```text
//! <root>/
//!   sessions/<session-id>.json
//!   chunks/<session-id>/000001.bin
//! ```
//!
//! Mutating session operations serialize through a per-session async
//! mutex, so the receipt-and-recompute step stays atomic while distinct
//! sessions proceed independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{SessionStatus, UploadSession};
use crate::store::{ChunkReceipt, ChunkStore, SessionStore};

/// File extension for session records.
const SESSION_FILE_EXTENSION: &str = ".json";

/// Store backend that persists sessions and chunks to disk.
#[derive(Debug)]
pub struct DiskStore {
    sessions_dir: PathBuf,
    chunks_dir: PathBuf,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl DiskStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let sessions_dir = root.join("sessions");
        let chunks_dir = root.join("chunks");

        fs::create_dir_all(&sessions_dir).await?;
        fs::create_dir_all(&chunks_dir).await?;

        Ok(Self {
            sessions_dir,
            chunks_dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir
            .join(format!("{id}{SESSION_FILE_EXTENSION}"))
    }

    fn chunk_path(&self, session_id: Uuid, chunk_number: u32) -> PathBuf {
        self.chunks_dir
            .join(session_id.to_string())
            .join(format!("{chunk_number:06}.bin"))
    }

    async fn session_lock(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks.lock().await.entry(id).or_default().clone()
    }

    async fn load(&self, id: Uuid) -> Result<Option<UploadSession>> {
        let path = self.session_path(id);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: UploadSession = serde_json::from_str(&contents).map_err(|e| {
            Error::Serialization(format!(
                "corrupt session record {}: {e}",
                path.display()
            ))
        })?;
        Ok(Some(session))
    }

    async fn save(&self, session: &UploadSession) -> Result<()> {
        let path = self.session_path(session.id);
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| Error::Serialization(format!("session record: {e}")))?;

        write_atomic(&path, json.as_bytes()).await?;

        tracing::debug!(
            session_id = %session.id,
            status = %session.status,
            "saved session record"
        );
        Ok(())
    }
}

/// Write `contents` to `path` via a temp file so readers never observe a
/// partial record.
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[async_trait]
impl SessionStore for DiskStore {
    async fn create(&self, session: UploadSession) -> Result<()> {
        self.save(&session).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>> {
        self.load(id).await
    }

    async fn record_chunk(&self, id: Uuid, chunk_number: u32) -> Result<ChunkReceipt> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?.ok_or(Error::SessionNotFound(id))?;
        let newly_recorded = session.record_chunk(chunk_number)?;
        self.save(&session).await?;

        Ok(ChunkReceipt {
            snapshot: session.snapshot(),
            newly_recorded,
        })
    }

    async fn begin_finalize(&self, id: Uuid) -> Result<UploadSession> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?.ok_or(Error::SessionNotFound(id))?;
        if session.status != SessionStatus::Finalized {
            session.begin_finalize()?;
            self.save(&session).await?;
        }
        Ok(session)
    }

    async fn complete_finalize(&self, id: Uuid, output_path: &Path) -> Result<()> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?.ok_or(Error::SessionNotFound(id))?;
        session.complete_finalize(output_path.to_path_buf());
        self.save(&session).await
    }

    async fn abort_finalize(&self, id: Uuid) -> Result<()> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        let mut session = self.load(id).await?.ok_or(Error::SessionNotFound(id))?;
        session.abort_finalize();
        self.save(&session).await
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let lock = self.session_lock(id).await;
        let _guard = lock.lock().await;

        match fs::remove_file(self.session_path(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        drop(_guard);
        self.locks.lock().await.remove(&id);

        tracing::debug!(session_id = %id, "removed session record");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UploadSession>> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.sessions_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !filename.ends_with(SESSION_FILE_EXTENSION) {
                continue;
            }

            let Some(id) = filename
                .strip_suffix(SESSION_FILE_EXTENSION)
                .and_then(|stem| stem.parse::<Uuid>().ok())
            else {
                continue;
            };

            match self.load(id).await {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable session record"
                    );
                }
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[async_trait]
impl ChunkStore for DiskStore {
    async fn put_chunk(&self, session_id: Uuid, chunk_number: u32, payload: &[u8]) -> Result<()> {
        let path = self.chunk_path(session_id, chunk_number);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        write_atomic(&path, payload).await?;

        tracing::debug!(
            session_id = %session_id,
            chunk = chunk_number,
            bytes = payload.len(),
            "stored chunk"
        );
        Ok(())
    }

    async fn get_chunk(&self, session_id: Uuid, chunk_number: u32) -> Result<Option<Vec<u8>>> {
        match fs::read(self.chunk_path(session_id, chunk_number)).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_chunks(&self, session_id: Uuid) -> Result<()> {
        match fs::remove_dir_all(self.chunks_dir.join(session_id.to_string())).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = DiskStore::open(temp_dir.path()).await.expect("open");

        let mut session = UploadSession::new("archive.tar", 4, 1024);
        session.record_chunk(2).expect("record");
        let id = session.id;

        store.create(session).await.expect("create");

        let loaded = store.get(id).await.expect("get").expect("exists");
        assert_eq!(loaded.filename, "archive.tar");
        assert!(loaded.received_chunks.contains(&2));
        assert_eq!(loaded.status, SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = DiskStore::open(temp_dir.path()).await.expect("open");

        assert!(store.get(Uuid::new_v4()).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_chunk_round_trip_and_overwrite() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = DiskStore::open(temp_dir.path()).await.expect("open");
        let id = Uuid::new_v4();

        store.put_chunk(id, 3, b"first").await.expect("put");
        store.put_chunk(id, 3, b"second").await.expect("re-put");

        let payload = store.get_chunk(id, 3).await.expect("get").expect("exists");
        assert_eq!(payload, b"second");

        store.remove_chunks(id).await.expect("remove all");
        assert!(store.get_chunk(id, 3).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let id = {
            let store = DiskStore::open(temp_dir.path()).await.expect("open");
            let session = UploadSession::new("big.iso", 10, 4096);
            let id = session.id;
            store.create(session).await.expect("create");
            store.record_chunk(id, 1).await.expect("record");
            store.put_chunk(id, 1, b"payload-1").await.expect("put");
            id
        };

        let reopened = DiskStore::open(temp_dir.path()).await.expect("reopen");
        let session = reopened.get(id).await.expect("get").expect("exists");
        assert!(session.received_chunks.contains(&1));

        let payload = reopened.get_chunk(id, 1).await.expect("get").expect("exists");
        assert_eq!(payload, b"payload-1");
    }

    #[tokio::test]
    async fn test_list_sorted_by_recency() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = DiskStore::open(temp_dir.path()).await.expect("open");

        let older = UploadSession::new("older.bin", 1, 64);
        let older_id = older.id;
        store.create(older).await.expect("create");

        let newer = UploadSession::new("newer.bin", 1, 64);
        let newer_id = newer.id;
        store.create(newer).await.expect("create");

        // touching the older session makes it the most recent
        store.record_chunk(older_id, 1).await.expect("record");

        let listed = store.list().await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, older_id);
        assert_eq!(listed[1].id, newer_id);
    }

    #[tokio::test]
    async fn test_remove_session_record() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = DiskStore::open(temp_dir.path()).await.expect("open");

        let session = UploadSession::new("gone.bin", 1, 64);
        let id = session.id;
        store.create(session).await.expect("create");

        store.remove(id).await.expect("remove");
        assert!(store.get(id).await.expect("get").is_none());

        // removing twice is fine
        store.remove(id).await.expect("remove again");
    }
}
