//! Scoreboard server configuration.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum concurrent WebSocket connections across all sessions.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Broadcast channel capacity per session. A subscriber further behind
    /// than this re-syncs from a full snapshot.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> usize {
    256
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_connections: default_max_connections(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
