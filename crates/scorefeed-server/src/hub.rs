//! Scoreboard fan-out hub.
//!
//! One bounded tokio `broadcast` channel per live session. The store hands
//! state changes to [`ScoreboardHub::publish`] (still holding the session
//! lock, so send order matches apply order); each subscribed WebSocket
//! connection forwards from its own receiver, so one slow or dead consumer
//! never stalls the others. A receiver that falls behind the channel
//! capacity observes `Lagged` and re-syncs from the store's full snapshot.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use scorefeed_core::{DisplayMode, SessionId, SessionSnapshot};
use scorefeed_store::{SnapshotPublisher, StoreEvent};
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::types::{diff_messages, ScoreboardMessage};

/// Per-session fan-out state.
struct SessionChannel {
    tx: broadcast::Sender<String>,
    viewers: Arc<AtomicU32>,
}

/// A live subscription handed to one WebSocket task.
///
/// Dropping the feed releases its slot in the session's viewer count.
pub struct SessionFeed {
    pub viewer_id: Uuid,
    pub mode: DisplayMode,
    pub rx: broadcast::Receiver<String>,
    _guard: ViewerGuard,
}

/// Decrements the session viewer count on drop.
struct ViewerGuard {
    viewers: Arc<AtomicU32>,
}

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.viewers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Publish/subscribe hub for all sessions.
pub struct ScoreboardHub {
    channels: DashMap<SessionId, SessionChannel>,
    /// Sessions whose channel was torn down after the terminal message.
    /// Stops a late subscribe from re-creating the channel and leaving a
    /// permanent entry no publisher will ever close.
    ended: DashSet<SessionId>,
    /// Broadcast channel capacity per session. A subscriber further behind
    /// than this is lagged and must re-sync; it is never blocked on.
    capacity: usize,
}

impl ScoreboardHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            ended: DashSet::new(),
            capacity,
        }
    }

    /// Subscribe a viewer to a session's update stream.
    ///
    /// The channel is created on demand so viewers can connect before the
    /// first score arrives. Subscribing to a session that already ended
    /// yields a feed whose receiver is closed from the start; it never
    /// re-opens the session's channel.
    pub fn subscribe(&self, session: &SessionId, mode: DisplayMode) -> SessionFeed {
        if self.ended.contains(session) {
            return Self::closed_feed(mode);
        }

        let entry = self
            .channels
            .entry(session.clone())
            .or_insert_with(|| self.new_channel());

        entry.viewers.fetch_add(1, Ordering::AcqRel);
        let feed = SessionFeed {
            viewer_id: Uuid::new_v4(),
            mode,
            rx: entry.tx.subscribe(),
            _guard: ViewerGuard {
                viewers: entry.viewers.clone(),
            },
        };

        debug!(
            session = %session,
            viewer = %feed.viewer_id,
            mode = %mode,
            viewers = entry.viewers.load(Ordering::Acquire),
            "Viewer subscribed"
        );

        feed
    }

    /// Currently connected viewers for a session.
    pub fn viewer_count(&self, session: &SessionId) -> u32 {
        self.channels
            .get(session)
            .map(|c| c.viewers.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Fill the viewer count into an outgoing snapshot.
    pub fn stamp_viewer_count(&self, snapshot: &mut SessionSnapshot) {
        snapshot.meta.viewer_count = self.viewer_count(&snapshot.meta.id);
    }

    fn new_channel(&self) -> SessionChannel {
        let (tx, _) = broadcast::channel(self.capacity);
        SessionChannel {
            tx,
            viewers: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A feed whose receiver reports `Closed` on the first recv, outside
    /// any session's viewer count.
    fn closed_feed(mode: DisplayMode) -> SessionFeed {
        let (tx, rx) = broadcast::channel(1);
        drop(tx);
        SessionFeed {
            viewer_id: Uuid::new_v4(),
            mode,
            rx,
            _guard: ViewerGuard {
                viewers: Arc::new(AtomicU32::new(1)),
            },
        }
    }

    fn send(&self, session: &SessionId, message: &ScoreboardMessage) {
        let Some(channel) = self.channels.get(session) else {
            return;
        };

        match serde_json::to_string(message) {
            Ok(json) => match channel.tx.send(json) {
                Ok(n) => trace!(session = %session, receivers = n, "Broadcast sent"),
                // No receivers connected; normal between viewers.
                Err(_) => trace!(session = %session, "No receivers connected"),
            },
            Err(e) => debug!(session = %session, error = %e, "Failed to serialize message"),
        }
    }
}

impl SnapshotPublisher for ScoreboardHub {
    fn publish(&self, event: StoreEvent) {
        match event {
            StoreEvent::Applied { previous, mut current } => {
                let session = current.meta.id.clone();
                self.stamp_viewer_count(&mut current);
                for message in diff_messages(&previous, &current) {
                    self.send(&session, &message);
                }
            }
            StoreEvent::Ended {
                session,
                mut final_snapshot,
            } => {
                self.stamp_viewer_count(&mut final_snapshot);
                let statistics = final_snapshot.statistics();
                let revision = final_snapshot.revision;
                self.send(
                    &session,
                    &ScoreboardMessage::ScoreboardUpdate {
                        snapshot: final_snapshot,
                        statistics,
                    },
                );
                self.send(
                    &session,
                    &ScoreboardMessage::SessionEnded {
                        session: session.clone(),
                        revision,
                    },
                );
                // Mark ended before removing so a concurrent subscribe
                // cannot slip a fresh channel in between.
                self.ended.insert(session.clone());
                // Dropping the sender closes every receiver after the
                // terminal message drains.
                self.channels.remove(&session);
                debug!(session = %session, "Session channel closed");
            }
        }
    }
}
