//! Shared helpers for integration tests.

// not every test binary uses every helper
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use hoist_core::client::{LocalTransport, UploadTransport};
use hoist_core::engine::SessionEngine;
use hoist_core::error::{Error, Result};
use hoist_core::session::{ChunkAck, SessionSnapshot};

/// Write a patterned test file of `len` bytes and return its path.
pub async fn make_test_file(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    tokio::fs::write(&path, &data).await.expect("write test file");
    path
}

/// Transport wrapper that records every chunk number it sends.
pub struct RecordingTransport {
    inner: LocalTransport,
    sent: Arc<Mutex<Vec<u32>>>,
}

impl RecordingTransport {
    pub fn new(engine: SessionEngine) -> Self {
        Self {
            inner: LocalTransport::new(engine),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Chunk numbers sent so far, in completion order.
    pub fn sent(&self) -> Vec<u32> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Handle that stays valid after the transport moves into an uploader.
    pub fn sent_handle(&self) -> Arc<Mutex<Vec<u32>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl UploadTransport for RecordingTransport {
    async fn initialize(
        &self,
        filename: &str,
        total_chunks: u32,
        chunk_size: u64,
    ) -> Result<Uuid> {
        self.inner.initialize(filename, total_chunks, chunk_size).await
    }

    async fn send_chunk(&self, id: Uuid, chunk_number: u32, payload: Vec<u8>) -> Result<ChunkAck> {
        let ack = self.inner.send_chunk(id, chunk_number, payload).await?;
        self.sent.lock().expect("sent lock").push(chunk_number);
        Ok(ack)
    }

    async fn finalize(&self, id: Uuid) -> Result<std::path::PathBuf> {
        self.inner.finalize(id).await
    }

    async fn status(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.inner.status(id).await
    }
}

/// Transport wrapper that refuses to deliver one specific chunk number.
pub struct FailingTransport {
    inner: LocalTransport,
    fail_chunk: u32,
}

impl FailingTransport {
    pub fn new(engine: SessionEngine, fail_chunk: u32) -> Self {
        Self {
            inner: LocalTransport::new(engine),
            fail_chunk,
        }
    }
}

#[async_trait]
impl UploadTransport for FailingTransport {
    async fn initialize(
        &self,
        filename: &str,
        total_chunks: u32,
        chunk_size: u64,
    ) -> Result<Uuid> {
        self.inner.initialize(filename, total_chunks, chunk_size).await
    }

    async fn send_chunk(&self, id: Uuid, chunk_number: u32, payload: Vec<u8>) -> Result<ChunkAck> {
        if chunk_number == self.fail_chunk {
            return Err(Error::Transport(format!(
                "injected failure for chunk {chunk_number}"
            )));
        }
        self.inner.send_chunk(id, chunk_number, payload).await
    }

    async fn finalize(&self, id: Uuid) -> Result<std::path::PathBuf> {
        self.inner.finalize(id).await
    }

    async fn status(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.inner.status(id).await
    }
}
