//! scorefeed-server - scoreboard broadcaster and HTTP surface.
//!
//! This crate fans standings updates out to all connected viewers and
//! serves the public scoreboard API:
//!
//! - REST pull endpoint for the latest full snapshot (polling fallback)
//! - WebSocket push channel with per-session fan-out
//! - Active-sessions discovery for the public index page
//! - Judge submission boundary feeding the session store
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       scorefeed process                        │
//! │                                                                │
//! │   POST …/scores ──► SessionStore ──StoreEvent──► ScoreboardHub │
//! │                        │  apply()                   │ fan-out  │
//! │                        │                            ▼          │
//! │   GET …/api ◄──────────┘              broadcast::Sender per    │
//! │   (pull fallback)                     session ──► WS viewers   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod hub;
pub mod server;
pub mod types;

pub use config::ServerConfig;
pub use hub::{ScoreboardHub, SessionFeed};
pub use server::{create_router, run_server, AppState, ConnectionLimiter};
pub use types::{
    diff_messages, ScoreboardApiResponse, ScoreboardMessage, SessionSummary, SubmissionAccepted,
    SubmissionPayload,
};
