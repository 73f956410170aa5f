//! Upload command implementation.

use anyhow::Result;
use tokio::task::JoinHandle;

use hoist_core::client::{HttpTransport, UploadOutcome, Uploader, UploaderConfig};
use hoist_core::error::Error;

use crate::ui;

use super::UploadArgs;

/// Run the upload command.
pub async fn run(args: UploadArgs) -> Result<()> {
    let config = super::load_config();

    let server = args.server.unwrap_or(config.transfer.server_url);
    let uploader_config = UploaderConfig {
        chunk_size: args.chunk_size.unwrap_or(config.transfer.chunk_size),
        concurrency: args.concurrency.unwrap_or(config.transfer.concurrency),
    };

    let uploader = Uploader::new(HttpTransport::new(&server), uploader_config);

    if !args.quiet && !args.json {
        println!();
        println!("Hoist v{}", hoist_core::VERSION);
        println!("{}", "-".repeat(37));
        println!();
        println!("  Uploading {} to {server}", args.file.display());
        println!();
    }

    let printer = spawn_progress_printer(&uploader, args.quiet || args.json);

    let result = uploader.upload(&args.file).await;

    if let Some(printer) = printer {
        printer.abort();
        ui::finish_progress();
    }

    match result {
        Ok(outcome) => {
            report_success(&outcome, args.json);
            Ok(())
        }
        Err(e) => {
            report_failure(&uploader, &e, &args.file.display().to_string());
            Err(e.into())
        }
    }
}

/// Spawn a task that re-renders the progress line on every update.
pub fn spawn_progress_printer<T>(
    uploader: &Uploader<T>,
    suppressed: bool,
) -> Option<JoinHandle<()>>
where
    T: hoist_core::client::UploadTransport + 'static,
{
    if suppressed {
        return None;
    }

    let mut progress_rx = uploader.progress();
    Some(tokio::spawn(async move {
        while progress_rx.changed().await.is_ok() {
            let progress = progress_rx.borrow().clone();
            ui::print_progress(&progress);
        }
    }))
}

/// Print the outcome of a finished upload.
pub fn report_success(outcome: &UploadOutcome, json: bool) {
    if json {
        let output = serde_json::json!({
            "status": "finalized",
            "session_id": outcome.session_id,
            "output_path": outcome.output_path,
            "total_chunks": outcome.total_chunks,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        println!("  Upload complete ({} chunks)", outcome.total_chunks);
        println!("  Assembled at {}", outcome.output_path.display());
    }
}

/// Surface a failed attempt together with the resume hint when the
/// session survived.
pub fn report_failure<T>(uploader: &Uploader<T>, error: &Error, file: &str)
where
    T: hoist_core::client::UploadTransport + 'static,
{
    eprintln!();
    eprintln!("  Upload failed: {error}");

    if error.is_recoverable() {
        if let Some(session_id) = uploader.progress().borrow().session_id {
            eprintln!();
            eprintln!("  The session is still resumable:");
            eprintln!("    hoist resume {session_id} {file}");
        }
    }
}
