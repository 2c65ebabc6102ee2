//! Scoreboard viewer client.
//!
//! Consumes a live scoreboard feed and keeps a local model in sync:
//! - WebSocket push feed with reconnection and exponential backoff
//! - HTTP polling fallback once the reconnect budget is spent
//! - Push re-probing from the polling phase
//! - Revision-based discard of stale or re-delivered updates
//! - Per-display presentation (standard, mobile, tv)

pub mod backoff;
pub mod client;
pub mod error;
pub mod model;
pub mod view;

pub use backoff::ReconnectPolicy;
pub use client::{ViewerClient, ViewerConfig};
pub use error::{ViewerError, ViewerResult};
pub use model::{ConnectionStatus, RenderOp, ScoreboardModel, TeamRow, SCORE_ANIMATION_MS};
pub use view::{LogSurface, RenderSurface, ViewOptions};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
