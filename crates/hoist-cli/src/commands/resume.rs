//! Resume command implementation.

use anyhow::Result;

use hoist_core::client::{HttpTransport, Uploader, UploaderConfig};

use crate::ui;

use super::upload::{report_failure, report_success, spawn_progress_printer};
use super::ResumeArgs;

/// Run the resume command.
pub async fn run(args: ResumeArgs) -> Result<()> {
    let config = super::load_config();

    let server = args.server.unwrap_or(config.transfer.server_url);
    // chunk size comes from the server's session record on resume; the
    // configured value is irrelevant here
    let uploader_config = UploaderConfig {
        concurrency: config.transfer.concurrency,
        ..Default::default()
    };

    let uploader = Uploader::new(HttpTransport::new(&server), uploader_config);

    if !args.quiet && !args.json {
        println!();
        println!("Hoist v{}", hoist_core::VERSION);
        println!("{}", "-".repeat(37));
        println!();
        println!("  Resuming session {}", args.session_id);
        println!();
    }

    let printer = spawn_progress_printer(&uploader, args.quiet || args.json);

    let result = uploader.resume(args.session_id, &args.file).await;

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
