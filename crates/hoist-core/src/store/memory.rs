//! In-memory store backend.
//!
//! Keeps sessions and chunk payloads in maps behind async mutexes. Each
//! map's mutex serializes mutation, which is exactly the per-session
//! atomicity the engine's receipt/completion contract requires.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{SessionStatus, UploadSession};
use crate::store::{ChunkReceipt, ChunkStore, SessionStore};

/// Store backend that keeps everything in memory.
///
/// Suited to tests and to embedding the engine in a process that does not
/// need uploads to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<Uuid, UploadSession>>,
    chunks: Mutex<HashMap<Uuid, BTreeMap<u32, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: UploadSession) -> Result<()> {
        self.sessions.lock().await.insert(session.id, session);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>> {
        Ok(self.sessions.lock().await.get(&id).cloned())
    }

    async fn record_chunk(&self, id: Uuid, chunk_number: u32) -> Result<ChunkReceipt> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;

        let newly_recorded = session.record_chunk(chunk_number)?;
        Ok(ChunkReceipt {
            snapshot: session.snapshot(),
            newly_recorded,
        })
    }

    async fn begin_finalize(&self, id: Uuid) -> Result<UploadSession> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;

        if session.status != SessionStatus::Finalized {
            session.begin_finalize()?;
        }
        Ok(session.clone())
    }

    async fn complete_finalize(&self, id: Uuid, output_path: &Path) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;

        session.complete_finalize(output_path.to_path_buf());
        Ok(())
    }

    async fn abort_finalize(&self, id: Uuid) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;

        session.abort_finalize();
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions.lock().await.remove(&id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UploadSession>> {
        let mut sessions: Vec<UploadSession> =
            self.sessions.lock().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[async_trait]
impl ChunkStore for MemoryStore {
    async fn put_chunk(&self, session_id: Uuid, chunk_number: u32, payload: &[u8]) -> Result<()> {
        self.chunks
            .lock()
            .await
            .entry(session_id)
            .or_default()
            .insert(chunk_number, payload.to_vec());
        Ok(())
    }

    async fn get_chunk(&self, session_id: Uuid, chunk_number: u32) -> Result<Option<Vec<u8>>> {
        Ok(self
            .chunks
            .lock()
            .await
            .get(&session_id)
            .and_then(|by_number| by_number.get(&chunk_number).cloned()))
    }

    async fn remove_chunks(&self, session_id: Uuid) -> Result<()> {
        self.chunks.lock().await.remove(&session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new();
        let session = UploadSession::new("a.bin", 3, 64);
        let id = session.id;

        store.create(session).await.expect("create");

        let loaded = store.get(id).await.expect("get").expect("exists");
        assert_eq!(loaded.filename, "a.bin");
        assert_eq!(loaded.total_chunks, 3);
    }

    #[tokio::test]
    async fn test_record_chunk_unknown_session() {
        let store = MemoryStore::new();
        let err = store
            .record_chunk(Uuid::new_v4(), 1)
            .await
            .expect_err("unknown session");
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_chunk_put_overwrites() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        store.put_chunk(id, 1, b"first").await.expect("put");
        store.put_chunk(id, 1, b"second").await.expect("re-put");

        let payload = store.get_chunk(id, 1).await.expect("get").expect("exists");
        assert_eq!(payload, b"second");
    }

    #[tokio::test]
    async fn test_remove_all_chunks() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();

        store.put_chunk(id, 1, b"x").await.expect("put");
        store.put_chunk(id, 2, b"y").await.expect("put");
        store.remove_chunks(id).await.expect("remove");

        assert!(store.get_chunk(id, 1).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_begin_finalize_on_finalized_is_short_circuit() {
        let store = MemoryStore::new();
        let mut session = UploadSession::new("a.bin", 1, 64);
        session.record_chunk(1).expect("record");
        let id = session.id;
        store.create(session).await.expect("create");

        store.begin_finalize(id).await.expect("begin");
        store
            .complete_finalize(id, Path::new("/out/a.bin"))
            .await
            .expect("complete");

        let again = store.begin_finalize(id).await.expect("idempotent");
        assert_eq!(again.status, SessionStatus::Finalized);
        assert_eq!(
            again.output_path.as_deref(),
            Some(Path::new("/out/a.bin"))
        );
    }
}
