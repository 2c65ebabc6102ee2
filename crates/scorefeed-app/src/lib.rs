//! Scorefeed application.
//!
//! Assembles the pipeline end to end:
//! - Session store holding the authoritative snapshots
//! - Standings engine recomputing totals and ranks per submission
//! - Broadcast hub fanning updates out to connected viewers
//! - HTTP/WebSocket server surface

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
