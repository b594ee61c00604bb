//! Live Alert Feed - Main Entry Point

use clap::Parser;
use feed_cli::{init_logging, run, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.json_logs)?;

    info!("=== Live Alert Feed v{} ===", env!("CARGO_PKG_VERSION"));

    run(cli).await
}
