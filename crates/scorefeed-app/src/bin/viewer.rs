//! Terminal scoreboard viewer - entry point.
//!
//! Follows one session's feed and logs every board change. Useful for
//! smoke-testing a server and as the reference consumer of the protocol.

use anyhow::Result;
use clap::Parser;
use scorefeed_core::{DisplayMode, SessionId};
use scorefeed_viewer::{LogSurface, ViewerClient, ViewerConfig};
use tracing::info;

/// Terminal viewer for a live scoreboard session
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Session id to watch
    #[arg(short, long)]
    session: String,

    /// Display layout: standard, mobile, or tv
    #[arg(short, long, default_value = "standard")]
    mode: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // TLS provider must be installed before any WS connections
    scorefeed_viewer::init_crypto();

    let args = Args::parse();

    scorefeed_telemetry::init_logging()?;

    let mut config = ViewerConfig::new(args.url, SessionId::new(args.session));
    config.mode = DisplayMode::from_query(Some(&args.mode));

    info!(session = %config.session, mode = %config.mode, "Starting viewer");

    let mut surface = LogSurface::new(config.mode);
    let mut client = ViewerClient::new(config);

    let shutdown = client.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    client.run(&mut surface).await?;

    Ok(())
}
