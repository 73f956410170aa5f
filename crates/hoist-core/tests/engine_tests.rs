//! Integration tests for the server-side session engine.
//!
//! These cover the protocol's load-bearing properties: idempotent chunk
//! receipt, atomic completion detection under concurrency, exactly-once
//! ordered reassembly, and the integrity guard on finalize.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::task::JoinSet;

use hoist_core::engine::SessionEngine;
use hoist_core::error::Error;
use hoist_core::session::{SessionStatus, UploadSession};
use hoist_core::store::{ChunkStore, MemoryStore, SessionStore};

fn chunk_payload(chunk_number: u32, len: usize) -> Vec<u8> {
    vec![u8::try_from(chunk_number % 251).expect("small"); len]
}

#[tokio::test]
async fn test_all_chunks_in_any_order_reach_complete() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("any-order.bin", 4, 8).await.expect("init");

    for chunk_number in [3, 1, 4, 2] {
        engine
            .receive_chunk(id, chunk_number, &chunk_payload(chunk_number, 8))
            .await
            .expect("receive");
    }

    let snapshot = engine.status(id).await.expect("status");
    assert_eq!(snapshot.status, SessionStatus::Complete);
    assert_eq!(snapshot.received_chunks, vec![1, 2, 3, 4]);
    assert!(snapshot.missing_chunks().is_empty());
}

#[tokio::test]
async fn test_re_receiving_a_chunk_is_a_no_op() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("dupes.bin", 3, 8).await.expect("init");

    let first = engine
        .receive_chunk(id, 2, &chunk_payload(2, 8))
        .await
        .expect("receive");
    assert!(!first.already_received);
    assert_eq!(first.received, 1);

    let second = engine
        .receive_chunk(id, 2, &chunk_payload(2, 8))
        .await
        .expect("re-receive");
    assert!(second.already_received);
    assert_eq!(second.received, 1);
    assert_eq!(second.status, SessionStatus::InProgress);
}

#[tokio::test]
async fn test_concurrent_receipts_lose_nothing() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("parallel.bin", 5, 16).await.expect("init");

    let mut tasks = JoinSet::new();
    for chunk_number in 1..=5u32 {
        let engine = engine.clone();
        tasks.spawn(async move {
            engine
                .receive_chunk(id, chunk_number, &chunk_payload(chunk_number, 16))
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.expect("join").expect("receive");
    }

    let snapshot = engine.status(id).await.expect("status");
    assert_eq!(snapshot.received_chunks, vec![1, 2, 3, 4, 5]);
    assert_eq!(snapshot.status, SessionStatus::Complete);
}

#[tokio::test]
async fn test_finalize_concatenates_in_ascending_order() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("ordered.bin", 3, 4).await.expect("init");

    // receive out of order with distinct content per chunk
    engine.receive_chunk(id, 3, b"CCCC").await.expect("receive");
    engine.receive_chunk(id, 1, b"AAAA").await.expect("receive");
    engine.receive_chunk(id, 2, b"BBBB").await.expect("receive");

    let output_path = engine.finalize(id).await.expect("finalize");
    let assembled = tokio::fs::read(&output_path).await.expect("read output");
    assert_eq!(assembled, b"AAAABBBBCCCC");
}

#[tokio::test]
async fn test_finalize_is_idempotent() {
    let out = TempDir::new().expect("tempdir");
    let store = Arc::new(MemoryStore::new());
    let engine = SessionEngine::new(store.clone(), store.clone(), out.path());

    let id = engine.initialize("twice.bin", 2, 4).await.expect("init");
    engine.receive_chunk(id, 1, b"aaaa").await.expect("receive");
    engine.receive_chunk(id, 2, b"bb").await.expect("receive");

    let first = engine.finalize(id).await.expect("finalize");

    // chunk records are retired by the first finalize
    assert!(store.get_chunk(id, 1).await.expect("get").is_none());
    assert!(store.get_chunk(id, 2).await.expect("get").is_none());

    // the second call returns the cached result without chunk records
    let second = engine.finalize(id).await.expect("finalize again");
    assert_eq!(first, second);

    let assembled = tokio::fs::read(&first).await.expect("read output");
    assert_eq!(assembled, b"aaaabb");
}

#[tokio::test]
async fn test_finalize_guards_against_missing_chunk_records() {
    let out = TempDir::new().expect("tempdir");
    let store = Arc::new(MemoryStore::new());
    let engine = SessionEngine::new(store.clone(), store.clone(), out.path());

    // forge a session whose receipt set claims completion
    let mut session = UploadSession::new("forged.bin", 5, 4);
    for chunk_number in 1..=5 {
        session.record_chunk(chunk_number).expect("record");
    }
    let id = session.id;
    store.create(session).await.expect("create");

    // store records for every chunk except 3
    for chunk_number in [1, 2, 4, 5] {
        store
            .put_chunk(id, chunk_number, &chunk_payload(chunk_number, 4))
            .await
            .expect("put");
    }

    let err = engine.finalize(id).await.expect_err("must fail");
    assert!(matches!(err, Error::IncompleteUpload { ref missing } if missing == &vec![3]));

    // the failure leaves the session retryable, not failed
    let snapshot = engine.status(id).await.expect("status");
    assert_eq!(snapshot.status, SessionStatus::Complete);

    // supplying the missing record makes the retry succeed
    store.put_chunk(id, 3, &chunk_payload(3, 4)).await.expect("put");
    engine.finalize(id).await.expect("retry succeeds");
}

#[tokio::test]
async fn test_receive_after_finalize_is_rejected() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("done.bin", 1, 4).await.expect("init");
    engine.receive_chunk(id, 1, b"data").await.expect("receive");
    engine.finalize(id).await.expect("finalize");

    let err = engine
        .receive_chunk(id, 1, b"data")
        .await
        .expect_err("must reject");
    assert!(matches!(
        err,
        Error::InvalidState {
            status: SessionStatus::Finalized
        }
    ));
}

#[tokio::test]
async fn test_finalize_requires_completion() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    let id = engine.initialize("partial.bin", 3, 4).await.expect("init");
    engine.receive_chunk(id, 1, b"aaaa").await.expect("receive");

    let err = engine.finalize(id).await.expect_err("must fail");
    assert!(matches!(
        err,
        Error::InvalidState {
            status: SessionStatus::InProgress
        }
    ));
}

#[tokio::test]
async fn test_validation_errors() {
    let out = TempDir::new().expect("tempdir");
    let engine = SessionEngine::in_memory(out.path());

    // initialize rejects malformed arguments
    assert!(matches!(
        engine.initialize("x.bin", 0, 8).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.initialize("x.bin", 3, 0).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.initialize("../escape.bin", 3, 8).await,
        Err(Error::InvalidArgument(_))
    ));

    // unknown session
    let unknown = uuid::Uuid::new_v4();
    assert!(matches!(
        engine.receive_chunk(unknown, 1, b"aaaa").await,
        Err(Error::SessionNotFound(_))
    ));
    assert!(matches!(
        engine.status(unknown).await,
        Err(Error::SessionNotFound(_))
    ));

    let id = engine.initialize("x.bin", 3, 4).await.expect("init");

    // chunk number bounds
    assert!(matches!(
        engine.receive_chunk(id, 0, b"aaaa").await,
        Err(Error::ChunkOutOfRange { chunk: 0, .. })
    ));
    assert!(matches!(
        engine.receive_chunk(id, 4, b"aaaa").await,
        Err(Error::ChunkOutOfRange { chunk: 4, .. })
    ));

    // payload length must match the chunk size except for the final chunk
    assert!(matches!(
        engine.receive_chunk(id, 1, b"toolong").await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.receive_chunk(id, 3, b"").await,
        Err(Error::InvalidArgument(_))
    ));
    engine.receive_chunk(id, 3, b"ab").await.expect("short final chunk");
}

#[tokio::test]
async fn test_sweep_removes_only_stale_unfinished_sessions() {
    let out = TempDir::new().expect("tempdir");
    let store = Arc::new(MemoryStore::new());
    let engine = SessionEngine::new(store.clone(), store.clone(), out.path());

    // a stale in-progress session
    let mut stale = UploadSession::new("stale.bin", 3, 4);
    stale.record_chunk(1).expect("record");
    stale.updated_at = chrono::Utc::now() - chrono::Duration::hours(48);
    let stale_id = stale.id;
    store.create(stale).await.expect("create");
    store.put_chunk(stale_id, 1, b"aaaa").await.expect("put");

    // a stale but finalized session is kept
    let mut done = UploadSession::new("done.bin", 1, 4);
    done.record_chunk(1).expect("record");
    done.begin_finalize().expect("begin");
    done.complete_finalize(out.path().join("done.bin"));
    done.updated_at = chrono::Utc::now() - chrono::Duration::hours(48);
    let done_id = done.id;
    store.create(done).await.expect("create");

    // a fresh session is kept
    let fresh_id = engine.initialize("fresh.bin", 3, 4).await.expect("init");

    let swept = engine
        .sweep_stale(chrono::Duration::hours(24))
        .await
        .expect("sweep");
    assert_eq!(swept, 1);

    assert!(matches!(
        engine.status(stale_id).await,
        Err(Error::SessionNotFound(_))
    ));
    assert!(store.get_chunk(stale_id, 1).await.expect("get").is_none());
    assert!(engine.status(done_id).await.is_ok());
    assert!(engine.status(fresh_id).await.is_ok());
}
