//! CLI command definitions and handlers.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use uuid::Uuid;

/// Load configuration with graceful fallback to defaults.
///
/// If the config file doesn't exist or can't be parsed, it falls back to
/// defaults so every command still works out of the box.
pub fn load_config() -> hoist_core::config::Config {
    hoist_core::config::Config::load().unwrap_or_default()
}

pub mod completions;
pub mod config;
pub mod resume;
pub mod serve;
pub mod sessions;
pub mod status;
pub mod upload;

/// Hoist - Resumable chunked file uploads
#[derive(Parser)]
#[command(name = "hoist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the upload server
    Serve(ServeArgs),

    /// Upload a file
    Upload(UploadArgs),

    /// Resume an interrupted upload
    Resume(ResumeArgs),

    /// Show the status of an upload session
    Status(StatusArgs),

    /// List upload sessions on the server
    Sessions(SessionsArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Bind to localhost only
    #[arg(long)]
    pub localhost_only: bool,

    /// Directory for session records and chunk payloads
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory finalized files are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Skip the stale-session sweep on startup
    #[arg(long)]
    pub no_sweep: bool,
}

/// Arguments for the upload command
#[derive(Parser)]
pub struct UploadArgs {
    /// File to upload
    pub file: PathBuf,

    /// Server base URL (e.g. http://127.0.0.1:8080)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Chunk size in bytes
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Maximum concurrent chunk uploads
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the resume command
#[derive(Parser)]
pub struct ResumeArgs {
    /// Session ID printed by the original upload
    pub session_id: Uuid,

    /// The same file the upload started from
    pub file: PathBuf,

    /// Server base URL
    #[arg(short, long)]
    pub server: Option<String>,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Parser)]
pub struct StatusArgs {
    /// Session ID to query
    pub session_id: Uuid,

    /// Server base URL
    #[arg(short, long)]
    pub server: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the sessions command
#[derive(Parser)]
pub struct SessionsArgs {
    /// Server base URL
    #[arg(short, long)]
    pub server: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Reset the configuration to defaults
    Reset,
}

/// Arguments for the completions command
#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
