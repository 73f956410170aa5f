//! Sessions command implementation.

use anyhow::Result;

use hoist_core::client::HttpTransport;

use super::SessionsArgs;

/// Run the sessions command.
pub async fn run(args: SessionsArgs) -> Result<()> {
    let config = super::load_config();
    let server = args.server.unwrap_or(config.transfer.server_url);

    let transport = HttpTransport::new(&server);
    let sessions = transport.sessions().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No upload sessions on {server}");
        return Ok(());
    }

    println!();
    println!(
        "  {:<38} {:<12} {:>9} {}",
        "SESSION", "STATUS", "CHUNKS", "FILE"
    );
    for snapshot in &sessions {
        println!(
            "  {:<38} {:<12} {:>4}/{:<4} {}",
            snapshot.id,
            snapshot.status.to_string(),
            snapshot.received_chunks.len(),
            snapshot.total_chunks,
            snapshot.filename
        );
    }
    println!();

    Ok(())
}
