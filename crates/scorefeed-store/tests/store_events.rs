//! End-to-end store tests through the publisher seam.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use scorefeed_core::{
    JudgeId, ScoreSubmission, ScoringCategory, ScoringModel, SessionId, SessionStatus, TeamId,
};
use scorefeed_store::{RosterEntry, SessionConfig, SessionStore, SnapshotPublisher, StoreEvent};

/// Captures every published event in order.
#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<StoreEvent>>,
}

impl SnapshotPublisher for RecordingPublisher {
    fn publish(&self, event: StoreEvent) {
        self.events.lock().push(event);
    }
}

fn session_config(id: &str, teams: u32) -> SessionConfig {
    SessionConfig {
        id: SessionId::from(id),
        name: "Qualifier".to_string(),
        competition: "State".to_string(),
        category: "arduino".to_string(),
        status: SessionStatus::Active,
        roster: (1..=teams)
            .map(|i| RosterEntry {
                team: TeamId::new(i),
                name: format!("Team {i}"),
                school: format!("School {i}"),
            })
            .collect(),
        scoring: ScoringModel::new(vec![ScoringCategory {
            name: "mission".to_string(),
            multiplier: Decimal::ONE,
            criteria: vec!["mission".to_string()],
            max_score: None,
        }]),
    }
}

fn submission(session: &str, team: u32, judge: &str, score: Decimal) -> ScoreSubmission {
    let scores: BTreeMap<String, Decimal> =
        [("mission".to_string(), score)].into_iter().collect();
    ScoreSubmission::new(
        SessionId::from(session),
        TeamId::new(team),
        JudgeId::new(judge),
        scores,
    )
}

#[test]
fn publishes_applied_events_in_apply_order() {
    let publisher = Arc::new(RecordingPublisher::default());
    let store = SessionStore::new(publisher.clone());
    store.create(session_config("s1", 3));

    store.apply(submission("s1", 1, "a", dec!(50))).unwrap();
    store.apply(submission("s1", 2, "a", dec!(75))).unwrap();

    let events = publisher.events.lock();
    assert_eq!(events.len(), 2);

    match (&events[0], &events[1]) {
        (
            StoreEvent::Applied {
                previous: p0,
                current: c0,
            },
            StoreEvent::Applied {
                previous: p1,
                current: c1,
            },
        ) => {
            assert_eq!(p0.revision, 0);
            assert_eq!(c0.revision, 1);
            // The second event's previous is the first event's current.
            assert_eq!(p1.revision, 1);
            assert_eq!(c1.revision, 2);
            assert_eq!(p1, c0);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn pull_read_matches_published_push_state() {
    let publisher = Arc::new(RecordingPublisher::default());
    let store = SessionStore::new(publisher.clone());
    store.create(session_config("s1", 3));

    store.apply(submission("s1", 1, "a", dec!(50))).unwrap();
    store.apply(submission("s1", 1, "b", dec!(70))).unwrap();

    // A reconnecting viewer that polls the store sees exactly what the
    // last push delivered: no divergence between pull and push paths.
    let pulled = store.get(&SessionId::from("s1")).unwrap();
    let events = publisher.events.lock();
    let StoreEvent::Applied { current, .. } = events.last().unwrap() else {
        panic!("expected applied event");
    };
    assert_eq!(&pulled, current);
}

#[test]
fn end_emits_exactly_one_terminal_event() {
    let publisher = Arc::new(RecordingPublisher::default());
    let store = SessionStore::new(publisher.clone());
    store.create(session_config("s1", 2));

    store.apply(submission("s1", 1, "a", dec!(10))).unwrap();
    store.end(&SessionId::from("s1")).unwrap();
    // Second end fails and must not publish again.
    assert!(store.end(&SessionId::from("s1")).is_err());

    let events = publisher.events.lock();
    let terminal: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, StoreEvent::Ended { .. }))
        .collect();
    assert_eq!(terminal.len(), 1);

    if let StoreEvent::Ended { final_snapshot, .. } = terminal[0] {
        assert!(final_snapshot.standings.iter().all(|s| s.finalized));
    }
}

#[test]
fn sessions_are_independent() {
    let publisher = Arc::new(RecordingPublisher::default());
    let store = SessionStore::new(publisher);
    store.create(session_config("morning", 2));
    store.create(session_config("afternoon", 2));

    store.end(&SessionId::from("morning")).unwrap();

    // The other session still accepts scores.
    let snapshot = store
        .apply(submission("afternoon", 1, "a", dec!(42)))
        .unwrap();
    assert_eq!(snapshot.revision, 1);
}
