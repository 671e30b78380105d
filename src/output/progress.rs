//! Live per-collection progress driven by the status channel.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinHandle;

use crate::download::{RunStatus, StatusReceiver};

/// One spinner per collection.
pub struct ProgressBoard {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A board that renders nothing.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: HashMap::new(),
        }
    }

    /// Render one status update.
    pub fn update(&mut self, status: &RunStatus) {
        let bar = self
            .bars
            .entry(status.collection.clone())
            .or_insert_with(|| self.multi.add(create_spinner()));

        let message = match status.progress() {
            Some(fraction) => format!("@{} {} [{:.0}%]", status.collection, status, fraction * 100.0),
            None => format!("@{} {}", status.collection, status),
        };

        if status.phase.is_terminal() {
            bar.finish_with_message(message);
        } else {
            bar.set_message(message);
        }
    }

    /// Number of collections seen so far.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Whether the collection reached a terminal phase.
    pub fn is_finished(&self, collection: &str) -> bool {
        self.bars
            .get(collection)
            .map(ProgressBar::is_finished)
            .unwrap_or(false)
    }
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a spinner for long-running operations.
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Consume status updates until every sender is gone.
///
/// With `show` off updates are only logged at debug level.
pub fn spawn_progress(mut updates: StatusReceiver, show: bool) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut board = if show {
            ProgressBoard::new()
        } else {
            ProgressBoard::hidden()
        };
        while let Some(status) = updates.recv().await {
            if !show {
                tracing::debug!("@{} {}", status.collection, status);
            }
            board.update(&status);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{status_channel, RunPhase};

    #[test]
    fn test_board_tracks_collections() {
        let mut board = ProgressBoard::hidden();
        let mut status = RunStatus::new("jack");
        status.phase = RunPhase::Paginating;
        board.update(&status);
        board.update(&RunStatus::new("ann"));
        assert_eq!(board.len(), 2);
        assert!(!board.is_finished("jack"));

        status.phase = RunPhase::Completed;
        board.update(&status);
        assert_eq!(board.len(), 2);
        assert!(board.is_finished("jack"));
    }

    #[tokio::test]
    async fn test_progress_task_ends_with_channel() {
        let (tx, rx) = status_channel();
        let task = spawn_progress(rx, false);
        tx.send(RunStatus::new("jack")).unwrap();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
