//! Session state store.
//!
//! Holds the authoritative standings snapshot per live session. `apply` is
//! the sole mutation path and is serialized per session id; different
//! sessions proceed fully in parallel. After each successful apply the new
//! snapshot is handed to the broadcaster through the [`SnapshotPublisher`]
//! seam.

pub mod publisher;
pub mod store;

pub use publisher::{NullPublisher, SnapshotPublisher, StoreEvent};
pub use store::{RosterEntry, SessionConfig, SessionStore};
