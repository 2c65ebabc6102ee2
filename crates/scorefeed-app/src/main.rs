//! Scorefeed live scoreboard server - entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Live scoreboard server for robotics competitions
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SCOREFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    scorefeed_telemetry::init_logging()?;

    info!("Starting scorefeed v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > SCOREFEED_CONFIG env var > default
    let config = match args
        .config
        .or_else(|| std::env::var("SCOREFEED_CONFIG").ok())
    {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            scorefeed_app::AppConfig::from_file(&path)?
        }
        None => scorefeed_app::AppConfig::load()?,
    };

    info!(
        port = config.server.port,
        sessions = config.sessions.len(),
        "Configuration loaded"
    );

    let app = scorefeed_app::Application::new(config);
    app.run().await?;

    Ok(())
}
