//! Per-session snapshot store.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use scorefeed_core::{
    Result, ScoreError, ScoreSubmission, ScoringModel, SessionId, SessionMeta, SessionSnapshot,
    SessionStatus, TeamId, TeamStanding,
};
use scorefeed_engine::{ScoreLedger, StandingsEngine};
use serde::Deserialize;
use tracing::{debug, info};

use crate::publisher::{SnapshotPublisher, StoreEvent};

/// One team in a session roster, as registered externally.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterEntry {
    pub team: TeamId,
    pub name: String,
    pub school: String,
}

/// Everything needed to open a live session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub id: SessionId,
    pub name: String,
    pub competition: String,
    pub category: String,
    /// Status the session opens in. Sessions registered ahead of the event
    /// start `scheduled` and are flipped live with [`SessionStore::set_status`].
    #[serde(default = "default_status")]
    pub status: SessionStatus,
    pub roster: Vec<RosterEntry>,
    pub scoring: ScoringModel,
}

fn default_status() -> SessionStatus {
    SessionStatus::Active
}

/// Per-session state behind the session lock.
struct SessionEntry {
    snapshot: SessionSnapshot,
    ledger: ScoreLedger,
    engine: StandingsEngine,
}

type Entry = Arc<Mutex<SessionEntry>>;

/// Authoritative snapshot holder for all live sessions.
///
/// Keyed by session id so submissions for different sessions never contend
/// on the same lock. All reads return owned clones; nothing outside the
/// store can mutate a stored snapshot.
pub struct SessionStore {
    sessions: DashMap<SessionId, Entry>,
    publisher: Arc<dyn SnapshotPublisher>,
}

impl SessionStore {
    pub fn new(publisher: Arc<dyn SnapshotPublisher>) -> Self {
        Self {
            sessions: DashMap::new(),
            publisher,
        }
    }

    /// Open a session with its roster and scoring model.
    ///
    /// Initial ranks are seeded 1..N in roster order with all totals zero,
    /// so the first recompute always has a previous rank to diff against.
    pub fn create(&self, config: SessionConfig) -> SessionSnapshot {
        let created_at = Utc::now();
        let standings: Vec<TeamStanding> = config
            .roster
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let mut standing = TeamStanding::for_roster_entry(
                    entry.team,
                    entry.name.clone(),
                    entry.school.clone(),
                    // Stagger roster timestamps so the zero-score tie-break
                    // follows registration order deterministically.
                    created_at + chrono::Duration::milliseconds(idx as i64),
                );
                standing.rank = idx as u32 + 1;
                standing.previous_rank = standing.rank;
                standing
            })
            .collect();

        let snapshot = SessionSnapshot {
            meta: SessionMeta {
                id: config.id.clone(),
                name: config.name,
                competition: config.competition,
                category: config.category,
                // Ended makes no sense at creation; treat it as active.
                status: match config.status {
                    SessionStatus::Ended => SessionStatus::Active,
                    status => status,
                },
                viewer_count: 0,
                judges_active: 0,
            },
            standings,
            revision: 0,
            taken_at: created_at,
        };

        info!(
            session = %config.id,
            teams = snapshot.standings.len(),
            "Session opened"
        );

        self.sessions.insert(
            config.id,
            Arc::new(Mutex::new(SessionEntry {
                snapshot: snapshot.clone(),
                ledger: ScoreLedger::new(),
                engine: StandingsEngine::new(config.scoring),
            })),
        );

        snapshot
    }

    /// Current snapshot for a session, as an owned copy.
    pub fn get(&self, session: &SessionId) -> Result<SessionSnapshot> {
        let entry = self.entry(session)?;
        let guard = entry.lock();
        Ok(guard.snapshot.clone())
    }

    /// Apply one submission: validate, recompute, store, publish.
    ///
    /// All-or-nothing; on any error the stored snapshot is unchanged.
    /// Serialized per session id by the entry lock, which is also held
    /// across `publish` so broadcast order matches apply order.
    pub fn apply(&self, submission: ScoreSubmission) -> Result<SessionSnapshot> {
        let session = submission.session.clone();
        let entry = self.entry(&session)?;
        let mut guard = entry.lock();

        match guard.snapshot.meta.status {
            SessionStatus::Active => {}
            SessionStatus::Ended => return Err(ScoreError::SessionEnded(session)),
            status => {
                return Err(ScoreError::SessionNotActive { session, status });
            }
        }

        guard.engine.model().validate(&submission)?;

        let (snapshot, ledger) =
            guard
                .engine
                .recompute(&guard.snapshot, &guard.ledger, submission)?;

        let previous = std::mem::replace(&mut guard.snapshot, snapshot.clone());
        guard.ledger = ledger;

        debug!(
            session = %session,
            revision = snapshot.revision,
            "Submission applied"
        );

        self.publisher.publish(StoreEvent::Applied {
            previous,
            current: snapshot.clone(),
        });

        Ok(snapshot)
    }

    /// Finalize a session.
    ///
    /// Flips every team's finalized flag, marks the status ended, and emits
    /// the terminal event. Subsequent applies fail with `SessionEnded`.
    pub fn end(&self, session: &SessionId) -> Result<SessionSnapshot> {
        let entry = self.entry(session)?;
        let mut guard = entry.lock();

        if guard.snapshot.meta.status == SessionStatus::Ended {
            return Err(ScoreError::SessionEnded(session.clone()));
        }

        guard.snapshot.meta.status = SessionStatus::Ended;
        guard.snapshot.revision += 1;
        guard.snapshot.taken_at = Utc::now();
        for standing in &mut guard.snapshot.standings {
            standing.finalized = true;
        }

        let final_snapshot = guard.snapshot.clone();

        info!(session = %session, revision = final_snapshot.revision, "Session ended");

        self.publisher.publish(StoreEvent::Ended {
            session: session.clone(),
            final_snapshot: final_snapshot.clone(),
        });

        Ok(final_snapshot)
    }

    /// Move a session between its non-terminal states.
    ///
    /// Covers the scheduled-to-active flip at match start and pausing a
    /// session mid-event. Ending is only reachable through [`end`], which
    /// also finalizes standings, so `Ended` is rejected here; an already
    /// ended session cannot be revived.
    ///
    /// [`end`]: SessionStore::end
    pub fn set_status(&self, session: &SessionId, status: SessionStatus) -> Result<SessionSnapshot> {
        let entry = self.entry(session)?;
        let mut guard = entry.lock();

        if guard.snapshot.meta.status == SessionStatus::Ended || status == SessionStatus::Ended {
            return Err(ScoreError::SessionEnded(session.clone()));
        }
        if guard.snapshot.meta.status == status {
            return Ok(guard.snapshot.clone());
        }

        let previous = guard.snapshot.clone();
        guard.snapshot.meta.status = status;
        guard.snapshot.revision += 1;
        guard.snapshot.taken_at = Utc::now();

        let snapshot = guard.snapshot.clone();

        info!(session = %session, status = ?status, "Session status changed");

        self.publisher.publish(StoreEvent::Applied {
            previous,
            current: snapshot.clone(),
        });

        Ok(snapshot)
    }

    /// Metadata for every session still in play, for the discovery endpoint.
    /// Ended sessions stay in the store for late pulls but are not listed.
    pub fn active_sessions(&self) -> Vec<SessionMeta> {
        self.sessions
            .iter()
            .map(|entry| entry.value().lock().snapshot.meta.clone())
            .filter(|meta| meta.status != SessionStatus::Ended)
            .collect()
    }

    fn entry(&self, session: &SessionId) -> Result<Entry> {
        self.sessions
            .get(session)
            .map(|e| e.value().clone())
            .ok_or_else(|| ScoreError::SessionNotFound(session.clone()))
    }
}
