//! Render surfaces and per-display presentation options.

use scorefeed_core::DisplayMode;
use tracing::info;

use crate::model::{ConnectionStatus, RenderOp, TeamRow};

/// How much of the board a given display shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Maximum rows on screen; `None` shows the whole field.
    pub max_rows: Option<usize>,
    /// Whether per-criterion breakdowns are shown on row expansion.
    pub show_breakdown: bool,
    /// Whether rank-change indicators animate.
    pub animate: bool,
}

impl ViewOptions {
    pub fn for_mode(mode: DisplayMode) -> Self {
        match mode {
            DisplayMode::Standard => Self {
                max_rows: None,
                show_breakdown: true,
                animate: true,
            },
            DisplayMode::Mobile => Self {
                max_rows: Some(10),
                show_breakdown: false,
                animate: false,
            },
            DisplayMode::Tv => Self {
                max_rows: Some(16),
                show_breakdown: false,
                animate: true,
            },
        }
    }

    /// Trim a full row list to what this display shows.
    pub fn visible<'a>(&self, rows: &'a [TeamRow]) -> &'a [TeamRow] {
        match self.max_rows {
            Some(max) if rows.len() > max => &rows[..max],
            _ => rows,
        }
    }
}

/// Output seam for the client loop. The reference implementation logs;
/// a real kiosk would paint a screen.
pub trait RenderSurface: Send {
    fn mode(&self) -> DisplayMode;

    /// Apply a batch of render operations, in order.
    fn render(&mut self, ops: &[RenderOp]);

    /// Connection status changed (shown as a banner on real displays).
    fn set_status(&mut self, status: ConnectionStatus);
}

/// Surface that writes the board to the log, one line per operation.
pub struct LogSurface {
    mode: DisplayMode,
    options: ViewOptions,
}

impl LogSurface {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            options: ViewOptions::for_mode(mode),
        }
    }
}

impl RenderSurface for LogSurface {
    fn mode(&self) -> DisplayMode {
        self.mode
    }

    fn render(&mut self, ops: &[RenderOp]) {
        for op in ops {
            match op {
                RenderOp::ReplaceAll { rows } => {
                    for row in self.options.visible(rows) {
                        info!(
                            rank = row.rank,
                            team = %row.team,
                            name = %row.name,
                            total = %row.total,
                            judges = row.judges_completed,
                            "Standing"
                        );
                    }
                }
                RenderOp::UpdateScore { team, from, to, .. } => {
                    info!(%team, %from, %to, "Score update");
                }
                RenderOp::MoveRank {
                    team,
                    from,
                    to,
                    trend,
                } => {
                    info!(%team, from, to, ?trend, "Rank change");
                }
                RenderOp::UpdateStats { statistics } => {
                    info!(
                        teams = statistics.teams,
                        judges = statistics.judges_active,
                        average = %statistics.average_score,
                        high = %statistics.high_score,
                        "Session statistics"
                    );
                }
                RenderOp::Finalize => {
                    info!("Final standings, board frozen");
                }
            }
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        info!(?status, "Connection status");
    }
}
