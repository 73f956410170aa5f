//! Status command implementation.

use anyhow::Result;

use hoist_core::client::{HttpTransport, UploadTransport};
use hoist_core::session::SessionSnapshot;

use crate::ui::format_size;

use super::StatusArgs;

/// Run the status command.
pub async fn run(args: StatusArgs) -> Result<()> {
    let config = super::load_config();
    let server = args.server.unwrap_or(config.transfer.server_url);

    let transport = HttpTransport::new(&server);
    let snapshot = transport.status(args.session_id).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    Ok(())
}

/// Print a human-readable session summary.
pub fn print_snapshot(snapshot: &SessionSnapshot) {
    println!();
    println!("  Session:  {}", snapshot.id);
    println!("  File:     {}", snapshot.filename);
    println!("  Status:   {}", snapshot.status);
    println!(
        "  Chunks:   {}/{} ({:.1}%)",
        snapshot.received_chunks.len(),
        snapshot.total_chunks,
        snapshot.percentage()
    );
    println!(
        "  Size:     {} per chunk",
        format_size(snapshot.chunk_size)
    );

    let missing = snapshot.missing_chunks();
    if !missing.is_empty() && missing.len() <= 16 {
        println!("  Missing:  {missing:?}");
    } else if !missing.is_empty() {
        println!("  Missing:  {} chunks", missing.len());
    }

    if let Some(output_path) = &snapshot.output_path {
        println!("  Output:   {}", output_path.display());
    }
    println!("  Updated:  {}", snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();
}
