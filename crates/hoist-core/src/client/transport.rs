//! Upload transports.
//!
//! The scheduler talks to the server through the [`UploadTransport`]
//! trait only. [`LocalTransport`] wires it straight into an in-process
//! [`SessionEngine`]; [`HttpTransport`] (feature `http-client`) speaks
//! the HTTP binding served by the `web` module.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::engine::SessionEngine;
use crate::error::Result;
use crate::session::{ChunkAck, SessionSnapshot};

/// Network seam between the scheduler and the session engine.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Create a session on the server; returns the session ID.
    async fn initialize(
        &self,
        filename: &str,
        total_chunks: u32,
        chunk_size: u64,
    ) -> Result<Uuid>;

    /// Deliver one chunk payload.
    async fn send_chunk(&self, id: Uuid, chunk_number: u32, payload: Vec<u8>) -> Result<ChunkAck>;

    /// Ask the server to assemble the output file.
    async fn finalize(&self, id: Uuid) -> Result<PathBuf>;

    /// Fetch the server's authoritative session snapshot.
    async fn status(&self, id: Uuid) -> Result<SessionSnapshot>;
}

/// Transport that calls a [`SessionEngine`] in the same process.
#[derive(Debug, Clone)]
pub struct LocalTransport {
    engine: SessionEngine,
}

impl LocalTransport {
    /// Wrap an engine.
    #[must_use]
    pub fn new(engine: SessionEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl UploadTransport for LocalTransport {
    async fn initialize(
        &self,
        filename: &str,
        total_chunks: u32,
        chunk_size: u64,
    ) -> Result<Uuid> {
        self.engine
            .initialize(filename, total_chunks, chunk_size)
            .await
    }

    async fn send_chunk(&self, id: Uuid, chunk_number: u32, payload: Vec<u8>) -> Result<ChunkAck> {
        self.engine.receive_chunk(id, chunk_number, &payload).await
    }

    async fn finalize(&self, id: Uuid) -> Result<PathBuf> {
        self.engine.finalize(id).await
    }

    async fn status(&self, id: Uuid) -> Result<SessionSnapshot> {
        self.engine.status(id).await
    }
}

#[cfg(feature = "http-client")]
pub use http::HttpTransport;

#[cfg(feature = "http-client")]
mod http {
    use super::{async_trait, ChunkAck, PathBuf, Result, SessionSnapshot, UploadTransport, Uuid};

    use crate::error::Error;
    use crate::protocol::{
        ErrorResponse, FinalizeResponse, InitializeRequest, InitializeResponse, CHUNK_FIELD,
    };

    /// Transport that speaks the HTTP binding of a remote Hoist server.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        base_url: String,
        client: reqwest::Client,
    }

    impl HttpTransport {
        /// Create a transport for a server base URL such as
        /// `http://127.0.0.1:8080`.
        #[must_use]
        pub fn new(base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            Self {
                base_url,
                client: reqwest::Client::new(),
            }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base_url)
        }

        /// Fetch every session the server knows about, most recent
        /// first. Not part of the scheduler seam; used by tooling.
        pub async fn sessions(&self) -> Result<Vec<SessionSnapshot>> {
            let response = self
                .client
                .get(self.url("/api/uploads"))
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| Error::Transport(e.to_string()))
        }

        /// Turn a non-success response into a transport error carrying
        /// the server's error body when one is present.
        async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => match body.code {
                    Some(code) => format!("{status}: [{code}] {}", body.message),
                    None => format!("{status}: {}", body.message),
                },
                Err(_) => status.to_string(),
            };
            Err(Error::Transport(message))
        }
    }

    #[async_trait]
    impl UploadTransport for HttpTransport {
        async fn initialize(
            &self,
            filename: &str,
            total_chunks: u32,
            chunk_size: u64,
        ) -> Result<Uuid> {
            let request = InitializeRequest {
                filename: filename.to_string(),
                total_chunks,
                chunk_size,
            };

            let response = self
                .client
                .post(self.url("/api/uploads"))
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            let body: InitializeResponse = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            Ok(body.session_id)
        }

        async fn send_chunk(
            &self,
            id: Uuid,
            chunk_number: u32,
            payload: Vec<u8>,
        ) -> Result<ChunkAck> {
            let part = reqwest::multipart::Part::bytes(payload)
                .file_name(chunk_number.to_string());
            let form = reqwest::multipart::Form::new().part(CHUNK_FIELD, part);

            let response = self
                .client
                .put(self.url(&format!("/api/uploads/{id}/chunks/{chunk_number}")))
                .multipart(form)
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| Error::Transport(e.to_string()))
        }

        async fn finalize(&self, id: Uuid) -> Result<PathBuf> {
            let response = self
                .client
                .post(self.url(&format!("/api/uploads/{id}/finalize")))
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            let body: FinalizeResponse = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            Ok(body.output_path)
        }

        async fn status(&self, id: Uuid) -> Result<SessionSnapshot> {
            let response = self
                .client
                .get(self.url(&format!("/api/uploads/{id}")))
                .send()
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;

            Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| Error::Transport(e.to_string()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_base_url_trailing_slash_stripped() {
            let transport = HttpTransport::new("http://localhost:8080/");
            assert_eq!(
                transport.url("/api/uploads"),
                "http://localhost:8080/api/uploads"
            );
        }
    }
}
