//! Application wiring and lifecycle.

use std::sync::Arc;

use scorefeed_server::{run_server, ScoreboardHub};
use scorefeed_store::SessionStore;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// The assembled scoreboard service.
pub struct Application {
    config: AppConfig,
    store: Arc<SessionStore>,
    hub: Arc<ScoreboardHub>,
}

impl Application {
    /// Wire the store to the broadcast hub.
    pub fn new(config: AppConfig) -> Self {
        let hub = Arc::new(ScoreboardHub::new(config.server.channel_capacity));
        let store = Arc::new(SessionStore::new(hub.clone()));

        Self { config, store, hub }
    }

    /// Open every configured session and serve until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        for session in &self.config.sessions {
            let snapshot = self.store.create(session.clone());
            info!(
                session = %snapshot.meta.id,
                name = %snapshot.meta.name,
                teams = snapshot.standings.len(),
                "Session opened"
            );
        }

        let server = run_server(self.store.clone(), self.hub.clone(), self.config.server);

        tokio::select! {
            result = server => {
                if let Err(e) = &result {
                    error!(error = %e, "Server exited with error");
                }
                result.map_err(|e| AppError::Server(e.to_string()))
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}
