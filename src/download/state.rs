//! Transient run state and cross-collection statistics.

use chrono::Utc;

use crate::download::status::{RunPhase, RunStatus, StatusSender};
use crate::error::Error;

/// Counters and phase of one collection run.
///
/// Owned by the run; observers only ever receive cloned [`RunStatus`] values.
#[derive(Debug)]
pub struct RunState {
    status: RunStatus,
    sink: Option<StatusSender>,
}

impl RunState {
    pub fn new(collection: &str, sink: Option<StatusSender>) -> Self {
        Self {
            status: RunStatus::new(collection),
            sink,
        }
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn phase(&self) -> RunPhase {
        self.status.phase
    }

    fn publish(&self) {
        if let Some(sink) = &self.sink {
            // A gone observer does not affect the run
            let _ = sink.send(self.status.clone());
        }
    }

    /// Enter a new phase and notify observers.
    pub fn transition(&mut self, phase: RunPhase) {
        if phase == RunPhase::Resuming && self.status.started_at.is_none() {
            self.status.started_at = Some(Utc::now());
        }
        tracing::debug!(
            "{}: {} -> {}",
            self.status.collection,
            self.status.phase,
            phase
        );
        self.status.phase = phase;
        self.publish();
    }

    /// Sync progress fields from the snapshot and notify observers.
    pub fn update_progress(
        &mut self,
        items: usize,
        pages: u64,
        cursor: Option<&str>,
        complete: bool,
    ) {
        self.status.items_found = items as u64;
        self.status.pages_fetched = pages;
        self.status.cursor = cursor.map(str::to_string);
        self.status.complete = complete;
        self.publish();
    }

    pub fn set_estimated_total(&mut self, total: Option<u64>) {
        self.status.estimated_total = total;
        self.publish();
    }

    pub fn asset_found(&mut self) {
        self.status.assets_found += 1;
    }

    pub fn asset_downloaded(&mut self) {
        self.status.assets_downloaded += 1;
    }

    pub fn asset_failed(&mut self, error: &Error) {
        self.status.assets_failed += 1;
        self.status.last_error = Some(error.to_string());
    }

    /// Notify observers about counter changes made since the last update.
    pub fn flush(&self) {
        self.publish();
    }

    pub fn complete(&mut self) {
        self.status.finished_at = Some(Utc::now());
        self.transition(RunPhase::Completed);
    }

    pub fn fail(&mut self, error: &Error) {
        self.status.last_error = Some(error.to_string());
        self.status.finished_at = Some(Utc::now());
        self.transition(RunPhase::Failed);
    }

    pub fn into_status(self) -> RunStatus {
        self.status
    }
}

/// Global statistics across all collections.
#[derive(Debug, Default)]
pub struct GlobalState {
    pub items_found: u64,
    pub assets_found: u64,
    pub assets_downloaded: u64,
    pub assets_failed: u64,
    pub collections_processed: u64,
    pub collections_failed: u64,
}

impl GlobalState {
    /// Add statistics from a finished run.
    pub fn add_run(&mut self, status: &RunStatus) {
        self.items_found += status.items_found;
        self.assets_found += status.assets_found;
        self.assets_downloaded += status.assets_downloaded;
        self.assets_failed += status.assets_failed;
        if status.failed() {
            self.collections_failed += 1;
        } else {
            self.collections_processed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::status::status_channel;

    #[test]
    fn test_transitions_are_published() {
        let (tx, mut rx) = status_channel();
        let mut state = RunState::new("jack", Some(tx));

        state.transition(RunPhase::Resuming);
        state.update_progress(4, 3, Some("10"), true);
        state.complete();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.phase, RunPhase::Resuming);
        assert!(first.started_at.is_some());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.items_found, 4);
        assert_eq!(second.cursor.as_deref(), Some("10"));

        let last = rx.try_recv().unwrap();
        assert_eq!(last.phase, RunPhase::Completed);
        assert!(last.finished_at.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_fail_keeps_error() {
        let mut state = RunState::new("jack", None);
        state.fail(&Error::Cancelled);
        let status = state.into_status();
        assert_eq!(status.phase, RunPhase::Failed);
        assert_eq!(status.last_error.as_deref(), Some("Run cancelled by stop signal"));
    }

    #[test]
    fn test_global_state() {
        let mut global = GlobalState::default();
        let mut ok = RunStatus::new("a");
        ok.phase = RunPhase::Completed;
        ok.assets_downloaded = 2;
        let mut failed = RunStatus::new("b");
        failed.phase = RunPhase::Failed;
        global.add_run(&ok);
        global.add_run(&failed);
        assert_eq!(global.collections_processed, 1);
        assert_eq!(global.collections_failed, 1);
        assert_eq!(global.assets_downloaded, 2);
    }
}
