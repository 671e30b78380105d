//! Bounded-concurrency asset downloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, Id, JoinError, JoinSet};
use tokio::time::{timeout_at, Instant};

use crate::api::AssetTransport;
use crate::download::control::StopSignal;
use crate::error::{Error, Result};
use crate::record::{AssetKey, AssetRef};
use crate::store::write_atomic;

/// Transport plus the process-wide download ceiling.
///
/// Cloned into every collection run so that all runs share one limit.
#[derive(Clone)]
pub struct DownloadPool {
    transport: Arc<dyn AssetTransport>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl DownloadPool {
    pub fn new(transport: Arc<dyn AssetTransport>, max_concurrent: usize) -> Self {
        let limit = max_concurrent.max(1);
        Self {
            transport,
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Downloads currently holding a slot.
    pub fn active(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// A scheduler whose tasks draw from this pool.
    pub fn scheduler(&self) -> DownloadScheduler {
        DownloadScheduler {
            pool: self.clone(),
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
        }
    }
}

/// Result of one download task.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub key: AssetKey,
    pub path: PathBuf,
    /// Bytes written on success.
    pub result: Result<u64>,
}

impl DownloadOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Handle to an enqueued download.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub key: AssetKey,
    abort: AbortHandle,
}

impl TaskHandle {
    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }
}

/// Outcomes collected while waiting for downloads to settle.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub outcomes: Vec<DownloadOutcome>,
    /// Tasks aborted before they settled.
    pub cancelled: usize,
    /// Waiting ended because of the stop signal.
    pub interrupted: bool,
}

/// Downloads belonging to one collection run.
pub struct DownloadScheduler {
    pool: DownloadPool,
    tasks: JoinSet<DownloadOutcome>,
    in_flight: HashMap<Id, (AssetKey, PathBuf)>,
}

impl DownloadScheduler {
    /// Start downloading `asset` to `destination`.
    ///
    /// Never blocks: the task itself waits for a free slot in the pool.
    pub fn enqueue(&mut self, asset: &AssetRef, destination: PathBuf) -> TaskHandle {
        let key = asset.key();
        let url = asset.url.clone();
        let transport = self.pool.transport.clone();
        let permits = self.pool.permits.clone();
        let task_key = key.clone();
        let task_path = destination.clone();

        let abort = self.tasks.spawn(async move {
            let result = transfer(transport, permits, &url, &task_path).await;
            DownloadOutcome {
                key: task_key,
                path: task_path,
                result,
            }
        });

        tracing::debug!("Queued download of {} -> {}", asset.url, destination.display());
        self.in_flight.insert(abort.id(), (key.clone(), destination));
        TaskHandle { key, abort }
    }

    /// Whether a download for this asset is queued or running.
    pub fn is_in_flight(&self, key: &AssetKey) -> bool {
        self.in_flight.values().any(|(k, _)| k == key)
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Outcomes of tasks that already finished, without waiting.
    pub fn take_completed(&mut self) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::new();
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            if let Some(outcome) = self.settle(joined) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Wait for every task to settle, for at most `limit`.
    ///
    /// Tasks still running at the deadline, or when `stop` fires, are
    /// aborted; their assets stay unsettled.
    pub async fn await_all(&mut self, limit: Duration, stop: &mut StopSignal) -> DrainReport {
        let deadline = Instant::now() + limit;
        let mut outcomes = Vec::new();
        let mut interrupted = false;

        loop {
            let joined = tokio::select! {
                joined = timeout_at(deadline, self.tasks.join_next_with_id()) => joined,
                _ = stop.stopped() => {
                    interrupted = true;
                    break;
                }
            };
            match joined {
                Ok(Some(joined)) => {
                    if let Some(outcome) = self.settle(joined) {
                        outcomes.push(outcome);
                    }
                }
                Ok(None) => {
                    return DrainReport {
                        outcomes,
                        cancelled: 0,
                        interrupted: false,
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        "Timed out waiting for {} download(s), cancelling",
                        self.tasks.len()
                    );
                    break;
                }
            }
        }

        let mut report = self.cancel_all().await;
        outcomes.append(&mut report.outcomes);
        report.outcomes = outcomes;
        report.interrupted = interrupted;
        report
    }

    /// Abort every task and collect whatever finished in the meantime.
    pub async fn cancel_all(&mut self) -> DrainReport {
        self.tasks.abort_all();

        let mut report = DrainReport::default();
        while let Some(joined) = self.tasks.join_next_with_id().await {
            match joined {
                Err(e) if e.is_cancelled() => {
                    self.in_flight.remove(&e.id());
                    report.cancelled += 1;
                }
                other => {
                    if let Some(outcome) = self.settle(other) {
                        report.outcomes.push(outcome);
                    }
                }
            }
        }
        report
    }

    /// Map a joined task to its outcome. A panicked task counts as a failed download.
    fn settle(
        &mut self,
        joined: std::result::Result<(Id, DownloadOutcome), JoinError>,
    ) -> Option<DownloadOutcome> {
        match joined {
            Ok((id, outcome)) => {
                self.in_flight.remove(&id);
                Some(outcome)
            }
            Err(e) => {
                let (key, path) = self.in_flight.remove(&e.id())?;
                if e.is_cancelled() {
                    return None;
                }
                Some(DownloadOutcome {
                    key,
                    path,
                    result: Err(Error::Download(format!("download task failed: {}", e))),
                })
            }
        }
    }
}

/// Fetch one asset and store it under `destination`.
async fn transfer(
    transport: Arc<dyn AssetTransport>,
    permits: Arc<Semaphore>,
    url: &str,
    destination: &Path,
) -> Result<u64> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| Error::Download("download pool closed".to_string()))?;

    let body = transport.fetch_asset(url).await?;
    let size = body.len() as u64;

    // write_atomic creates the parent directory
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&destination, &body))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed bytes after a delay, failing URLs containing "fail".
    struct SlowTransport {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowTransport {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssetTransport for SlowTransport {
        async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if url.contains("fail") {
                return Err(Error::Download("HTTP 500".into()));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn asset(id: &str, url: &str) -> AssetRef {
        AssetRef::new(id, 0, url, "photo")
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(SlowTransport::new(Duration::from_millis(20)));
        let pool = DownloadPool::new(transport.clone(), 2);
        let mut scheduler = pool.scheduler();

        for i in 0..6 {
            let a = asset(&i.to_string(), &format!("https://m/{}.jpg", i));
            let dest = dir.path().join("jack").join(a.file_name());
            scheduler.enqueue(&a, dest);
        }
        assert_eq!(scheduler.pending(), 6);

        let report = scheduler
            .await_all(Duration::from_secs(5), &mut StopSignal::never())
            .await;
        assert_eq!(report.outcomes.len(), 6);
        assert!(report.outcomes.iter().all(DownloadOutcome::succeeded));
        assert_eq!(transport.peak.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read(dir.path().join("jack").join("3_0.jpg")).unwrap(),
            b"https://m/3.jpg"
        );
        assert_eq!(pool.active(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DownloadPool::new(Arc::new(SlowTransport::new(Duration::ZERO)), 1);
        let mut scheduler = pool.scheduler();
        let a = asset("1", "https://m/fail.jpg");
        let dest = dir.path().join(a.file_name());
        let handle = scheduler.enqueue(&a, dest.clone());
        assert!(scheduler.is_in_flight(&handle.key));

        let report = scheduler
            .await_all(Duration::from_secs(5), &mut StopSignal::never())
            .await;
        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.outcomes[0].succeeded());
        assert!(!dest.exists());
        assert!(!scheduler.is_in_flight(&handle.key));
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_timeout_cancels_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DownloadPool::new(Arc::new(SlowTransport::new(Duration::from_secs(30))), 4);
        let mut scheduler = pool.scheduler();
        let a = asset("1", "https://m/slow.jpg");
        scheduler.enqueue(&a, dir.path().join(a.file_name()));

        let report = scheduler
            .await_all(Duration::from_millis(20), &mut StopSignal::never())
            .await;
        assert!(report.outcomes.is_empty());
        assert_eq!(report.cancelled, 1);
        assert_eq!(scheduler.pending(), 0);
        assert!(!scheduler.is_in_flight(&a.key()));
    }

    #[tokio::test]
    async fn test_take_completed_does_not_wait() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DownloadPool::new(Arc::new(SlowTransport::new(Duration::from_secs(30))), 1);
        let mut scheduler = pool.scheduler();
        let a = asset("1", "https://m/slow.jpg");
        scheduler.enqueue(&a, dir.path().join(a.file_name()));

        assert!(scheduler.take_completed().is_empty());
        assert_eq!(scheduler.pending(), 1);
        let report = scheduler.cancel_all().await;
        assert_eq!(report.cancelled, 1);
    }
}
