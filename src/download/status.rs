//! Run phases and the status snapshots published to observers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// State of one collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RunPhase {
    #[default]
    Idle,
    Resuming,
    Draining,
    RetryingSettledGaps,
    Paginating,
    AwaitingDownloads,
    Finalizing,
    Completed,
    Failed,
}

impl RunPhase {
    /// Completed and Failed end a run; a new run starts over from Idle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Resuming => write!(f, "resuming"),
            RunPhase::Draining => write!(f, "draining"),
            RunPhase::RetryingSettledGaps => write!(f, "retrying"),
            RunPhase::Paginating => write!(f, "paginating"),
            RunPhase::AwaitingDownloads => write!(f, "awaiting downloads"),
            RunPhase::Finalizing => write!(f, "finalizing"),
            RunPhase::Completed => write!(f, "completed"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Immutable view of a run, sent after every transition and counter change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatus {
    pub collection: String,
    pub run_id: Uuid,
    pub phase: RunPhase,
    pub items_found: u64,
    pub assets_found: u64,
    pub assets_downloaded: u64,
    pub assets_failed: u64,
    pub pages_fetched: u64,
    pub cursor: Option<String>,
    pub complete: bool,
    pub estimated_total: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl RunStatus {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            run_id: Uuid::new_v4(),
            phase: RunPhase::Idle,
            items_found: 0,
            assets_found: 0,
            assets_downloaded: 0,
            assets_failed: 0,
            pages_fetched: 0,
            cursor: None,
            complete: false,
            estimated_total: None,
            started_at: None,
            finished_at: None,
            last_error: None,
        }
    }

    /// Seconds since the run started (until it finished, if it did).
    pub fn duration_secs(&self) -> Option<f64> {
        let started = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Utc::now);
        Some((end - started).num_milliseconds() as f64 / 1000.0)
    }

    /// Fraction of the estimated total already fetched.
    pub fn progress(&self) -> Option<f64> {
        match self.estimated_total {
            Some(total) if total > 0 => Some((self.items_found as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    pub fn failed(&self) -> bool {
        self.phase == RunPhase::Failed
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status: {}", self.phase)?;
        if let Some(secs) = self.duration_secs() {
            write!(f, " ({:.1}s)", secs)?;
        }
        if self.complete {
            write!(f, " (Complete)")?;
        }
        write!(
            f,
            " | Tweets: {} | Images: {}/{}",
            self.items_found, self.assets_found, self.assets_downloaded
        )?;
        if self.pages_fetched > 0 {
            write!(f, " | Pages: {}", self.pages_fetched)?;
        }
        if let Some(error) = &self.last_error {
            write!(f, " | Error: {}", error)?;
        }
        Ok(())
    }
}

pub type StatusSender = mpsc::UnboundedSender<RunStatus>;
pub type StatusReceiver = mpsc::UnboundedReceiver<RunStatus>;

/// One-directional channel from the engine to a status observer.
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}
