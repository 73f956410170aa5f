//! HTTP endpoint handlers for the upload API.
//!
//! Each handler translates one request into one engine call and maps the
//! outcome back to JSON. Chunk payloads arrive either as a multipart
//! field named `chunk` (what browsers send) or as a raw
//! `application/octet-stream` body.

use axum::{
    body::Body,
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::protocol::{FinalizeResponse, InitializeRequest, InitializeResponse, CHUNK_FIELD};
use crate::session::{ChunkAck, SessionSnapshot, SessionStatus};

use super::error::{ApiError, ApiResult};
use super::state::SharedState;

/// Server status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Server version
    version: &'static str,
    /// Number of known sessions
    sessions: usize,
    /// Seconds since the server started
    uptime_secs: u64,
}

/// GET /api/status - Server status.
pub async fn get_status(State(state): State<SharedState>) -> ApiResult<Json<StatusResponse>> {
    let sessions = state.engine.sessions().await?;

    Ok(Json(StatusResponse {
        version: crate::VERSION,
        sessions: sessions.len(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    }))
}

/// POST /api/uploads - Initialize an upload session.
pub async fn initialize_upload(
    State(state): State<SharedState>,
    Json(request): Json<InitializeRequest>,
) -> ApiResult<(StatusCode, Json<InitializeResponse>)> {
    let session_id = state
        .engine
        .initialize(&request.filename, request.total_chunks, request.chunk_size)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitializeResponse { session_id }),
    ))
}

/// GET /api/uploads - List known sessions, most recent first.
pub async fn list_uploads(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<SessionSnapshot>>> {
    Ok(Json(state.engine.sessions().await?))
}

/// GET /api/uploads/{id} - Session status.
pub async fn get_upload(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(state.engine.status(id).await?))
}

/// PUT /api/uploads/{id}/chunks/{chunk} - Receive one chunk payload.
pub async fn upload_chunk(
    State(state): State<SharedState>,
    Path((id, chunk_number)): Path<(Uuid, u32)>,
    request: Request,
) -> ApiResult<Json<ChunkAck>> {
    let payload = read_chunk_payload(request).await?;

    let ack = state
        .engine
        .receive_chunk(id, chunk_number, &payload)
        .await?;
    Ok(Json(ack))
}

/// Pull the chunk bytes out of a multipart form or a raw body.
async fn read_chunk_payload(request: Request) -> ApiResult<Vec<u8>> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/"));

    if !is_multipart {
        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read request body: {e}")))?;
        return Ok(bytes.to_vec());
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read multipart field: {e}")))?
    {
        if field.name() == Some(CHUNK_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("failed to read chunk data: {e}")))?;
            return Ok(bytes.to_vec());
        }
    }

    Err(ApiError::bad_request(format!(
        "multipart body has no '{CHUNK_FIELD}' field"
    )))
}

/// POST /api/uploads/{id}/finalize - Assemble the output file.
pub async fn finalize_upload(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<FinalizeResponse>> {
    let output_path = state.engine.finalize(id).await?;
    Ok(Json(FinalizeResponse { output_path }))
}

/// GET /api/uploads/{id}/download - Stream the assembled file back.
pub async fn download_upload(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let snapshot = state.engine.status(id).await?;

    if snapshot.status != SessionStatus::Finalized {
        return Err(ApiError::conflict(format!(
            "session is {}, not finalized",
            snapshot.status
        )));
    }
    let output_path = snapshot
        .output_path
        .ok_or_else(|| ApiError::internal("finalized session has no output path"))?;

    let file = tokio::fs::File::open(&output_path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to open output file: {e}")))?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("failed to read output metadata: {e}")))?
        .len();

    let mime = mime_guess::from_path(&snapshot.filename).first_or_octet_stream();
    let stream = ReaderStream::new(file);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", snapshot.filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("failed to build response: {e}")))
}
