//! Wire types shared by the client transports and the web binding.
//!
//! The protocol is deliberately small: four operations, JSON bodies,
//! chunk payloads as multipart or raw bytes. Nothing here prescribes
//! REST paths; the web module owns the routing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for session initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Original file name
    pub filename: String,
    /// Total number of chunks the client will send
    pub total_chunks: u32,
    /// Bytes per chunk
    pub chunk_size: u64,
}

/// Response body for session initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// The session ID to use for all subsequent operations
    pub session_id: Uuid,
}

/// Response body for finalize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeResponse {
    /// Where the assembled file was written on the server
    pub output_path: PathBuf,
}

/// Error body returned by the server on any failed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code (e.g. "E002" for an unknown session)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
}

/// Multipart field name carrying the chunk payload.
pub const CHUNK_FIELD: &str = "chunk";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_request_round_trip() {
        let request = InitializeRequest {
            filename: "video.mkv".to_string(),
            total_chunks: 12,
            chunk_size: 5 * 1024 * 1024,
        };

        let json = serde_json::to_string(&request).expect("serialize");
        let restored: InitializeRequest = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.filename, "video.mkv");
        assert_eq!(restored.total_chunks, 12);
    }

    #[test]
    fn test_error_response_omits_missing_code() {
        let body = ErrorResponse {
            code: None,
            message: "boom".to_string(),
        };
        let json = serde_json::to_string(&body).expect("serialize");
        assert!(!json.contains("code"));
    }
}
