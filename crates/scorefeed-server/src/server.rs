//! HTTP server implementation using axum.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use scorefeed_core::{
    DisplayMode, ScoreError, ScoreSubmission, SessionId, SessionSnapshot, SessionStatus,
};
use scorefeed_store::SessionStore;

use crate::config::ServerConfig;
use crate::hub::{ScoreboardHub, SessionFeed};
use crate::types::{
    ScoreboardApiResponse, ScoreboardMessage, SessionSummary, SubmissionAccepted,
    SubmissionPayload,
};

/// Connection limiter to prevent too many concurrent WebSocket connections.
pub struct ConnectionLimiter {
    current: AtomicUsize,
    max: usize,
}

impl ConnectionLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            current: AtomicUsize::new(0),
            max,
        }
    }

    pub fn try_acquire(&self) -> Option<ConnectionGuard<'_>> {
        loop {
            let current = self.current.load(Ordering::Acquire);
            if current >= self.max {
                return None;
            }
            if self
                .current
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(ConnectionGuard { limiter: self });
            }
        }
    }

    pub fn current_count(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }
}

pub struct ConnectionGuard<'a> {
    limiter: &'a ConnectionLimiter,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.limiter.current.fetch_sub(1, Ordering::Release);
    }
}

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<SessionStore>,
    hub: Arc<ScoreboardHub>,
    connection_limiter: Arc<ConnectionLimiter>,
    config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>, hub: Arc<ScoreboardHub>, config: ServerConfig) -> Self {
        Self {
            store,
            hub,
            connection_limiter: Arc::new(ConnectionLimiter::new(config.max_connections)),
            config,
        }
    }
}

/// Maps submission-path errors to HTTP status codes.
struct ApiError(ScoreError);

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ScoreError::SessionNotFound(_) | ScoreError::UnknownTeam { .. } => {
                StatusCode::NOT_FOUND
            }
            ScoreError::InvalidScore(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScoreError::SessionEnded(_) | ScoreError::SessionNotActive { .. } => {
                StatusCode::CONFLICT
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Query parameters shared by the pull endpoint and the push upgrade.
#[derive(Debug, Deserialize)]
struct ScoreboardQuery {
    mode: Option<String>,
    detailed: Option<String>,
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/scoreboard/api/active-sessions", get(active_sessions))
        .route("/scoreboard/{session_id}/api", get(get_scoreboard))
        .route("/scoreboard/{session_id}/ws", get(ws_handler))
        .route("/scoreboard/{session_id}/scores", post(submit_scores))
        .route("/scoreboard/{session_id}/status", post(set_session_status))
        .route("/scoreboard/{session_id}/end", post(end_session))
        // Scoreboards are embedded in school sites and opened from phones.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Session discovery for the public index page. Ended sessions are not
/// listed; their snapshots stay reachable through the pull endpoint.
async fn active_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    let summaries = state
        .store
        .active_sessions()
        .into_iter()
        .map(|meta| SessionSummary {
            viewer_count: state.hub.viewer_count(&meta.id),
            id: meta.id,
            name: meta.name,
            competition: meta.competition,
            status: meta.status,
        })
        .collect();

    Json(summaries)
}

/// Pull endpoint: latest full snapshot for a session.
///
/// Advisory and idempotent; used by viewers whose push channel cannot be
/// established and during reconnect windows.
async fn get_scoreboard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ScoreboardQuery>,
) -> Result<Json<ScoreboardApiResponse>, ApiError> {
    let session = SessionId::new(session_id);
    let mode = DisplayMode::from_query(query.mode.as_deref());
    let detailed = query.detailed.as_deref() == Some("1");

    let mut snapshot = state.store.get(&session)?;
    state.hub.stamp_viewer_count(&mut snapshot);

    debug!(session = %session, %mode, detailed, "Pull snapshot served");
    Ok(Json(ScoreboardApiResponse::from_snapshot(snapshot, detailed)))
}

/// Judge scoring submission boundary.
async fn submit_scores(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<SubmissionAccepted>, ApiError> {
    let session = SessionId::new(session_id);
    let submission = ScoreSubmission::new(
        session.clone(),
        payload.team,
        payload.judge,
        payload.scores,
    );

    let snapshot = state.store.apply(submission)?;

    Ok(Json(SubmissionAccepted {
        session,
        team: payload.team,
        revision: snapshot.revision,
    }))
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: SessionStatus,
}

/// Session state transitions short of ending (admin boundary).
///
/// Flips a scheduled session live at match start, or pauses scoring during
/// a break. Ending goes through its own endpoint.
async fn set_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<ScoreboardApiResponse>, ApiError> {
    let session = SessionId::new(session_id);
    let snapshot = state.store.set_status(&session, payload.status)?;

    info!(session = %session, status = ?payload.status, "Session status set via API");
    Ok(Json(ScoreboardApiResponse::from_snapshot(snapshot, true)))
}

/// Finalize a session (admin boundary).
///
/// Fires the terminal broadcast to every subscriber; a second call is a
/// conflict.
async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ScoreboardApiResponse>, ApiError> {
    let session = SessionId::new(session_id);
    let snapshot = state.store.end(&session)?;

    info!(session = %session, revision = snapshot.revision, "Session ended via API");
    Ok(Json(ScoreboardApiResponse::from_snapshot(snapshot, true)))
}

/// WebSocket upgrade handler (push channel).
async fn ws_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ScoreboardQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let session = SessionId::new(session_id);
    let mode = DisplayMode::from_query(query.mode.as_deref());

    // Reject unknown and finalized sessions before upgrading.
    let snapshot = match state.store.get(&session) {
        Ok(snapshot) => snapshot,
        Err(err) => return ApiError(err).into_response(),
    };
    if snapshot.meta.status == SessionStatus::Ended {
        return ApiError(ScoreError::SessionEnded(session)).into_response();
    }

    let guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!(
                current = state.connection_limiter.current_count(),
                max = state.config.max_connections,
                "WebSocket connection limit reached"
            );
            return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
        }
    };

    info!(
        session = %session,
        %mode,
        connections = state.connection_limiter.current_count(),
        "New scoreboard viewer"
    );

    // The guard cannot move through the upgrade closure; the handler
    // re-acquires its slot once the socket is established.
    drop(guard);

    ws.on_upgrade(move |socket| handle_ws_connection(socket, state, session, mode))
}

/// Handle one scoreboard viewer connection.
async fn handle_ws_connection(
    socket: WebSocket,
    state: AppState,
    session: SessionId,
    mode: DisplayMode,
) {
    let _guard = match state.connection_limiter.try_acquire() {
        Some(guard) => guard,
        None => {
            warn!("Connection limit reached during upgrade");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the initial read so no update published in between
    // is missed; anything older than the initial snapshot is discarded by
    // the client via its revision.
    let mut feed: SessionFeed = state.hub.subscribe(&session, mode);

    if send_full_snapshot(&state, &session, &mut sender).await.is_err() {
        debug!(session = %session, "Failed to send initial snapshot, viewer disconnected");
        return;
    }

    // Drain incoming frames for close detection; pong is handled by axum.
    let mut incoming_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    debug!("Viewer sent close frame");
                    break;
                }
                Err(e) => {
                    debug!(error = %e, "WebSocket receive error");
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            result = feed.rx.recv() => {
                match result {
                    Ok(msg) => {
                        if sender.send(Message::Text(msg.into())).await.is_err() {
                            debug!(session = %session, "Viewer disconnected mid-send");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Coalesce: a viewer that fell behind only needs the
                        // current full state, not the missed diffs.
                        warn!(session = %session, skipped, "Viewer lagged, re-syncing");
                        if send_full_snapshot(&state, &session, &mut sender).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Session ended; the terminal message was already
                        // delivered through the channel.
                        debug!(session = %session, "Session channel closed");
                        break;
                    }
                }
            }
            _ = &mut incoming_task => {
                debug!(session = %session, "Incoming task completed, closing connection");
                break;
            }
        }
    }

    incoming_task.abort();

    info!(
        session = %session,
        viewer = %feed.viewer_id,
        "Scoreboard viewer disconnected"
    );
}

/// Send the store's current full state as a `scoreboard_update`.
async fn send_full_snapshot(
    state: &AppState,
    session: &SessionId,
    sender: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
) -> Result<(), axum::Error> {
    let mut snapshot: SessionSnapshot = match state.store.get(session) {
        Ok(snapshot) => snapshot,
        // Session was removed between subscribe and send; the channel
        // close path will finish the connection.
        Err(_) => return Ok(()),
    };
    state.hub.stamp_viewer_count(&mut snapshot);

    let statistics = snapshot.statistics();
    let message = ScoreboardMessage::ScoreboardUpdate {
        snapshot,
        statistics,
    };
    match serde_json::to_string(&message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            debug!(error = %e, "Failed to serialize snapshot");
            Ok(())
        }
    }
}

/// Run the scoreboard HTTP server.
pub async fn run_server(
    store: Arc<SessionStore>,
    hub: Arc<ScoreboardHub>,
    config: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let port = config.port;
    let state = AppState::new(store, hub, config);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting scoreboard server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_limiter() {
        let limiter = ConnectionLimiter::new(2);

        let a = limiter.try_acquire();
        let b = limiter.try_acquire();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(limiter.try_acquire().is_none());

        drop(a);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn test_api_error_status_mapping() {
        use scorefeed_core::TeamId;

        let cases = [
            (
                ScoreError::SessionNotFound(SessionId::from("x")),
                StatusCode::NOT_FOUND,
            ),
            (
                ScoreError::UnknownTeam {
                    session: SessionId::from("x"),
                    team: TeamId::new(9),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ScoreError::InvalidScore("bad".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ScoreError::SessionEnded(SessionId::from("x")),
                StatusCode::CONFLICT,
            ),
            (
                ScoreError::SessionNotActive {
                    session: SessionId::from("x"),
                    status: SessionStatus::Paused,
                },
                StatusCode::CONFLICT,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
