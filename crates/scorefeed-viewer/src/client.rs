//! Scoreboard feed client.
//!
//! Prefers the live push feed and falls back to HTTP polling once the
//! reconnect budget is spent. While polling, the push feed is re-probed
//! periodically so a recovered server promotes the client back to live
//! updates without user action.

use futures_util::{SinkExt, StreamExt};
use scorefeed_core::{DisplayMode, ScoreboardApiResponse, ScoreboardMessage, SessionId};
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::ReconnectPolicy;
use crate::error::ViewerResult;
use crate::model::{ConnectionStatus, ScoreboardModel};
use crate::view::RenderSurface;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Server base URL, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Session to watch.
    pub session: SessionId,
    /// Display layout requested from the server.
    pub mode: DisplayMode,
    /// Push reconnect budget.
    pub reconnect: ReconnectPolicy,
    /// Refresh cadence while in polling fallback.
    pub poll_interval_ms: u64,
    /// Re-probe the push feed after this many polls.
    pub probe_after_polls: u32,
}

impl ViewerConfig {
    pub fn new(base_url: impl Into<String>, session: SessionId) -> Self {
        Self {
            base_url: base_url.into(),
            session,
            mode: DisplayMode::Standard,
            reconnect: ReconnectPolicy::default(),
            poll_interval_ms: 10_000,
            probe_after_polls: 6,
        }
    }

    /// Push feed endpoint for this session.
    pub fn ws_url(&self) -> String {
        let ws_base = self
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/scoreboard/{}/ws?mode={}", ws_base, self.session, self.mode)
    }

    /// Pull endpoint for this session.
    pub fn pull_url(&self) -> String {
        format!(
            "{}/scoreboard/{}/api?mode={}",
            self.base_url, self.session, self.mode
        )
    }
}

/// Why a feed phase ended.
enum PhaseEnd {
    /// Session finished; terminal state, stop for good.
    Ended,
    /// Shutdown requested.
    Cancelled,
    /// Switch to the other transport.
    SwitchTransport,
}

/// Long-running scoreboard client.
pub struct ViewerClient {
    config: ViewerConfig,
    model: ScoreboardModel,
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl ViewerClient {
    pub fn new(config: ViewerConfig) -> Self {
        let model = ScoreboardModel::new(config.session.clone());
        Self {
            config,
            model,
            http: reqwest::Client::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the run loop; safe to trigger from another task.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn model(&self) -> &ScoreboardModel {
        &self.model
    }

    /// Mutable model access, for embedders driving interactions
    /// ([`ScoreboardModel::begin_interaction`] and friends).
    pub fn model_mut(&mut self) -> &mut ScoreboardModel {
        &mut self.model
    }

    /// Drive the feed until the session ends or shutdown is requested.
    pub async fn run(&mut self, surface: &mut dyn RenderSurface) -> ViewerResult<()> {
        loop {
            match self.run_push_phase(surface).await? {
                PhaseEnd::Ended => {
                    surface.set_status(ConnectionStatus::Ended);
                    return Ok(());
                }
                PhaseEnd::Cancelled => return Ok(()),
                PhaseEnd::SwitchTransport => {}
            }

            warn!(session = %self.config.session, "Push feed unavailable, polling instead");
            surface.set_status(ConnectionStatus::Polling);

            match self.run_poll_phase(surface).await? {
                PhaseEnd::Ended => {
                    surface.set_status(ConnectionStatus::Ended);
                    return Ok(());
                }
                PhaseEnd::Cancelled => return Ok(()),
                PhaseEnd::SwitchTransport => {
                    info!(session = %self.config.session, "Push feed probe succeeded");
                }
            }
        }
    }

    /// Connect-and-stream with bounded backoff. Returns `SwitchTransport`
    /// once the reconnect budget is exhausted.
    async fn run_push_phase(
        &mut self,
        surface: &mut dyn RenderSurface,
    ) -> ViewerResult<PhaseEnd> {
        let mut attempt = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(PhaseEnd::Cancelled);
            }

            surface.set_status(if attempt == 0 {
                ConnectionStatus::Connecting
            } else {
                ConnectionStatus::Reconnecting { attempt }
            });

            match self.stream_session(surface).await {
                Ok(end) => match end {
                    PhaseEnd::SwitchTransport => {
                        // Clean close by the server; retry below.
                        info!(session = %self.config.session, "Push feed closed");
                    }
                    other => return Ok(other),
                },
                Err(e) => {
                    error!(?e, session = %self.config.session, "Push feed error");
                }
            }

            attempt += 1;
            if self.config.reconnect.is_exhausted(attempt) {
                warn!(attempt, "Push reconnect budget spent");
                return Ok(PhaseEnd::SwitchTransport);
            }

            let delay = self.config.reconnect.delay_for(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => return Ok(PhaseEnd::Cancelled),
            }
        }
    }

    /// One connection lifetime: dial, stream, reconcile, render.
    async fn stream_session(
        &mut self,
        surface: &mut dyn RenderSurface,
    ) -> ViewerResult<PhaseEnd> {
        let url = self.config.ws_url();
        debug!(%url, "Connecting to push feed");

        let (ws_stream, _response) = connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        info!(session = %self.config.session, "Push feed connected");
        surface.set_status(ConnectionStatus::Live);

        let shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!(?e, "Close frame not delivered");
                    }
                    return Ok(PhaseEnd::Cancelled);
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let message: ScoreboardMessage = serde_json::from_str(&text)?;
                            let ops = self.model.ingest(message);
                            if !ops.is_empty() {
                                surface.render(&ops);
                            }
                            if self.model.is_ended() {
                                return Ok(PhaseEnd::Ended);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            debug!(code, %reason, "Push feed closed by server");
                            return Ok(PhaseEnd::SwitchTransport);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(PhaseEnd::SwitchTransport),
                    }
                }
            }
        }
    }

    /// HTTP fallback: refresh on an interval and re-probe push periodically.
    async fn run_poll_phase(
        &mut self,
        surface: &mut dyn RenderSurface,
    ) -> ViewerResult<PhaseEnd> {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut polls = 0u32;

        loop {
            if self.shutdown.is_cancelled() {
                return Ok(PhaseEnd::Cancelled);
            }

            match self.poll_once().await {
                Ok(response) => {
                    let ops = self.model.ingest_poll(response);
                    if !ops.is_empty() {
                        surface.render(&ops);
                    }
                    if self.model.is_ended() {
                        return Ok(PhaseEnd::Ended);
                    }
                }
                Err(e) => {
                    warn!(?e, session = %self.config.session, "Poll failed");
                }
            }

            polls += 1;
            if polls >= self.config.probe_after_polls {
                return Ok(PhaseEnd::SwitchTransport);
            }

            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                () = self.shutdown.cancelled() => return Ok(PhaseEnd::Cancelled),
            }
        }
    }

    async fn poll_once(&self) -> ViewerResult<ScoreboardApiResponse> {
        let response = self
            .http
            .get(self.config.pull_url())
            .send()
            .await?
            .error_for_status()?
            .json::<ScoreboardApiResponse>()
            .await?;
        Ok(response)
    }
}
