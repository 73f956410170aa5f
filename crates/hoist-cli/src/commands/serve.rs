//! Serve command implementation.

use anyhow::Result;

use hoist_core::engine::SessionEngine;
use hoist_core::web::{self, WebServerConfig};

use super::ServeArgs;

/// Run the serve command.
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = super::load_config();

    let port = args.port.unwrap_or(config.server.port);
    let data_dir = args.data_dir.unwrap_or_else(|| config.server.data_dir());
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| config.server.output_dir());

    tracing::debug!(port, data_dir = %data_dir.display(), "starting server");
    let engine = SessionEngine::on_disk(&data_dir, &output_dir).await?;

    if !args.no_sweep && config.cleanup.sweep_on_start {
        let max_age = chrono::Duration::seconds(
            i64::try_from(config.cleanup.max_session_age_secs).unwrap_or(i64::MAX),
        );
        engine.sweep_stale(max_age).await?;
    }

    println!();
    println!("Hoist v{}", hoist_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();
    println!("  Data:    {}", data_dir.display());
    println!("  Uploads: {}", output_dir.display());
    println!();

    let web_config = WebServerConfig {
        port,
        localhost_only: args.localhost_only,
        ..Default::default()
    }
    .with_chunk_size(config.transfer.chunk_size);

    web::serve(engine, web_config).await?;
    Ok(())
}
