//! # Hoist Core Library
//!
//! `hoist-core` provides the core functionality for Hoist, a resumable
//! chunked file upload system.
//!
//! ## How it works
//!
//! A client splits a file into fixed-size chunks and uploads them with
//! bounded concurrency. The server records each chunk idempotently,
//! detects completion atomically, and assembles the chunks into the
//! original file exactly once. Interrupted uploads resume from the
//! server's authoritative view of what already arrived; the client
//! keeps no durable state of its own.
//!
//! ## Modules
//!
//! - [`client`] - Client-side transfer scheduler and transports
//! - [`config`] - Configuration management
//! - [`engine`] - Server-side session engine
//! - [`protocol`] - Wire types shared by client and server
//! - [`session`] - Upload session model and status state machine
//! - [`store`] - Session and chunk storage (memory and disk backends)
//! - [`web`] - Axum HTTP binding for the engine (feature `web`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use hoist_core::client::{LocalTransport, Uploader};
//!
//! let transport = LocalTransport::new(engine);
//! let uploader = Uploader::new(transport, UploaderConfig::default());
//! let outcome = uploader.upload("./video.mkv").await?;
//! println!("assembled at {}", outcome.output_path.display());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod session;
pub mod store;

#[cfg(feature = "web")]
pub mod web;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chunk size for uploads (5 MiB)
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of concurrent chunk uploads
pub const DEFAULT_CONCURRENT_UPLOADS: usize = 5;

/// Default server port for the web binding
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Default age after which abandoned sessions are swept (24 hours)
pub const DEFAULT_MAX_SESSION_AGE_SECS: u64 = 24 * 60 * 60;
