//! Publication seam between the store and the broadcaster.

use scorefeed_core::{SessionId, SessionSnapshot};

/// State change handed to the broadcaster after a store mutation.
///
/// Carries the previous snapshot alongside the new one so the broadcaster
/// can emit per-team diffs without re-reading the store.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A submission was applied.
    Applied {
        previous: SessionSnapshot,
        current: SessionSnapshot,
    },
    /// The session was finalized; terminal event for its subscribers.
    Ended {
        session: SessionId,
        final_snapshot: SessionSnapshot,
    },
}

/// Receives store events in apply order per session.
///
/// Implemented by the broadcaster hub; the store calls it while still
/// holding the session's write lock, so event order matches apply order.
pub trait SnapshotPublisher: Send + Sync {
    fn publish(&self, event: StoreEvent);
}

/// Discards every event. For tests and headless tooling.
#[derive(Debug, Default)]
pub struct NullPublisher;

impl SnapshotPublisher for NullPublisher {
    fn publish(&self, _event: StoreEvent) {}
}
