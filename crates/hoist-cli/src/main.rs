//! Hoist CLI - Resumable chunked file uploads
//!
//! Hoist uploads large files in fixed-size chunks with bounded
//! concurrency, and picks up interrupted uploads exactly where they
//! stopped.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run a server
//! hoist serve --port 8080
//!
//! # Upload a file
//! hoist upload ./video.mkv --server http://127.0.0.1:8080
//!
//! # Continue after an interruption
//! hoist resume 2c5f4f6e-... ./video.mkv
//! ```

#![allow(clippy::doc_markdown)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Upload(args) => commands::upload::run(args).await,
        Command::Resume(args) => commands::resume::run(args).await,
        Command::Status(args) => commands::status::run(args).await,
        Command::Sessions(args) => commands::sessions::run(args).await,
        Command::Config(args) => commands::config::run(&args),
        Command::Completions(args) => {
            commands::completions::run(args.shell);
            Ok(())
        }
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,hoist=info,hoist_core=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
