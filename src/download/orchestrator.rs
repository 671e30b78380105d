//! Per-collection ingestion runs.
//!
//! A run walks through `Resuming -> Draining -> RetryingSettledGaps ->
//! Paginating -> AwaitingDownloads -> Finalizing` and ends in `Completed`
//! or `Failed`. The snapshot is saved after every page and after every
//! drained batch of downloads, so a failed or stopped run resumes from its
//! last saved page.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::api::FeedSource;
use crate::config::Config;
use crate::download::control::StopSignal;
use crate::download::paginator::{PageDelay, Paginator};
use crate::download::scheduler::{DownloadOutcome, DownloadPool, DownloadScheduler, DrainReport};
use crate::download::state::RunState;
use crate::download::status::{RunPhase, RunStatus, StatusSender};
use crate::error::{Error, Result};
use crate::export::export_collection;
use crate::fs::asset_path;
use crate::record::{extract_assets, AssetKey, AssetRef, Record};
use crate::store::{DurableStore, Snapshot};

/// Tunables of the ingestion engine.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub page_delay: PageDelay,
    /// Overall bound on waiting for downloads at the end of a run.
    pub drain_timeout: Duration,
    /// Extra retry passes over unsettled assets after downloads drain.
    pub retry_sweeps: u32,
    pub max_concurrent_collections: usize,
    pub export_directory: Option<PathBuf>,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            page_delay: PageDelay::new(Duration::from_secs(1), Duration::ZERO),
            drain_timeout: Duration::from_secs(600),
            retry_sweeps: 2,
            max_concurrent_collections: 8,
            export_directory: None,
        }
    }
}

impl HarvestSettings {
    pub fn from_config(config: &Config) -> Self {
        let options = &config.options;
        Self {
            page_delay: PageDelay::new(
                Duration::from_millis(options.page_delay_ms),
                Duration::from_millis(options.page_delay_jitter_ms),
            ),
            drain_timeout: Duration::from_secs(options.download_drain_timeout_seconds),
            retry_sweeps: options.retry_sweeps,
            max_concurrent_collections: options.max_concurrent_collections,
            export_directory: options.export_directory.clone(),
        }
    }
}

/// Runs collections against a feed, sharing one download pool.
pub struct Harvester {
    source: Arc<dyn FeedSource>,
    pool: DownloadPool,
    store: DurableStore,
    settings: HarvestSettings,
    status: Option<StatusSender>,
    stop: StopSignal,
}

impl Harvester {
    pub fn new(
        source: Arc<dyn FeedSource>,
        pool: DownloadPool,
        store: DurableStore,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            source,
            pool,
            store,
            settings,
            status: None,
            stop: StopSignal::never(),
        }
    }

    /// Publish every status change of every run to `sink`.
    pub fn with_status(mut self, sink: StatusSender) -> Self {
        self.status = Some(sink);
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    /// Run one collection to a terminal phase and return its final status.
    pub async fn run_collection(&self, key: &str) -> RunStatus {
        let mut run = CollectionRun::new(self, key);

        match run.execute().await {
            Ok(()) => {
                tracing::info!("Completed crawl for @{}", key);
                run.state.complete();
            }
            Err(e) => {
                tracing::error!("Failed crawl for @{}: {}", key, e);
                run.salvage().await;
                run.state.fail(&e);
            }
        }

        run.state.into_status()
    }

    /// Run several collections concurrently.
    pub async fn run_all(&self, keys: &[String]) -> Vec<RunStatus> {
        stream::iter(keys)
            .map(|key| self.run_collection(key))
            .buffer_unordered(self.settings.max_concurrent_collections.max(1))
            .collect()
            .await
    }
}

/// State of a single collection run. Sole writer of its snapshot.
struct CollectionRun<'a> {
    harvester: &'a Harvester,
    key: String,
    collection_dir: PathBuf,
    snapshot: Snapshot,
    loaded: bool,
    /// Record id -> index into `snapshot.records`.
    index: HashMap<String, usize>,
    paginator: Paginator,
    scheduler: DownloadScheduler,
    state: RunState,
    stop: StopSignal,
}

impl<'a> CollectionRun<'a> {
    fn new(harvester: &'a Harvester, key: &str) -> Self {
        Self {
            harvester,
            key: key.to_string(),
            collection_dir: PathBuf::new(),
            snapshot: Snapshot::new(key),
            loaded: false,
            index: HashMap::new(),
            paginator: Paginator::new(
                harvester.source.clone(),
                key,
                harvester.settings.page_delay,
            ),
            scheduler: harvester.pool.scheduler(),
            state: RunState::new(key, harvester.status.clone()),
            stop: harvester.stop.clone(),
        }
    }

    async fn execute(&mut self) -> Result<()> {
        self.resume().await?;
        self.drain_unprocessed().await?;
        self.retry_gaps();

        if !self.snapshot.completion_flag {
            self.estimate_total().await;
            self.paginate().await?;
        } else {
            tracing::info!("Already have all tweets for @{}, skipping fetch", self.key);
        }

        self.await_downloads().await?;
        self.finalize().await
    }

    /// Load the saved snapshot, or start empty.
    async fn resume(&mut self) -> Result<()> {
        self.state.transition(RunPhase::Resuming);
        self.collection_dir = self.harvester.store.collection_dir(&self.key)?;

        match self.harvester.store.load(&self.key).await? {
            Some(snapshot) => {
                tracing::info!(
                    "Loaded {} existing tweets for @{}",
                    snapshot.records.len(),
                    self.key
                );
                self.snapshot = snapshot;
            }
            None => tracing::info!("No saved progress for @{}, starting fresh", self.key),
        }
        self.loaded = true;

        for (i, record) in self.snapshot.records.iter().enumerate() {
            self.index.entry(record.id()).or_insert(i);
        }
        self.sync_progress();
        Ok(())
    }

    /// Extract and schedule assets of every record not processed yet.
    async fn drain_unprocessed(&mut self) -> Result<()> {
        self.state.transition(RunPhase::Draining);

        let pending: Vec<usize> = (0..self.snapshot.records.len())
            .filter(|&i| !self.snapshot.records[i].assets_processed)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        tracing::info!(
            "Processing {} tweets for @{} to extract media",
            pending.len(),
            self.key
        );
        for i in pending {
            self.process_record(i);
        }
        let finished = self.scheduler.take_completed();
        self.apply(finished);
        self.save().await
    }

    /// Re-enqueue assets that were scheduled before, are not settled and whose file is missing.
    fn retry_gaps(&mut self) -> usize {
        self.state.transition(RunPhase::RetryingSettledGaps);

        let mut queued = 0;
        for key in self.snapshot.retry_ledger.unsettled() {
            if self.scheduler.is_in_flight(&key) {
                continue;
            }
            let Some(asset) = self.find_asset(&key) else {
                tracing::debug!("No asset for {} in record {} any more", key.url, key.record_id);
                continue;
            };
            if self.schedule(&asset) {
                queued += 1;
            }
        }

        if queued > 0 {
            tracing::info!("Retrying {} unsettled downloads for @{}", queued, self.key);
        }
        self.state.flush();
        queued
    }

    async fn estimate_total(&mut self) {
        match self.harvester.source.total_count(&self.key).await {
            Ok(total) => self.state.set_estimated_total(total),
            Err(e) => tracing::warn!("Could not fetch profile of @{}: {}", self.key, e),
        }
    }

    /// Fetch pages until the feed is exhausted, saving after each one.
    async fn paginate(&mut self) -> Result<()> {
        self.state.transition(RunPhase::Paginating);
        tracing::info!("Starting tweet fetch for @{}", self.key);

        while !self.snapshot.completion_flag {
            let cursor = self.snapshot.cursor.clone();
            let page = self
                .paginator
                .next_page(cursor.as_deref(), &mut self.stop)
                .await?;
            self.snapshot.pages_fetched += 1;

            let fetched = page.records.len();
            let added = self.append(page.records);
            tracing::info!(
                "Retrieved {} tweets ({} new) for @{} (page {})",
                fetched,
                added.len(),
                self.key,
                self.snapshot.pages_fetched
            );
            for i in added.iter().copied() {
                self.process_record(i);
            }
            let finished = self.scheduler.take_completed();
            self.apply(finished);

            // An inclusive upstream cursor returns the boundary record again;
            // a page with nothing new that does not move the cursor is the end.
            let stalled = added.is_empty() && page.new_cursor == cursor;
            match page.new_cursor {
                Some(next) if !page.exhausted && !stalled => self.snapshot.cursor = Some(next),
                _ => self.snapshot.completion_flag = true,
            }

            self.sync_progress();
            self.save().await?;
        }

        tracing::info!(
            "Completed tweet fetch for @{}, found {} tweets",
            self.key,
            self.snapshot.records.len()
        );
        Ok(())
    }

    /// Wait for outstanding downloads, with retry sweeps over failures.
    async fn await_downloads(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.harvester.settings.drain_timeout;
        let mut sweeps = 0;

        loop {
            self.state.transition(RunPhase::AwaitingDownloads);
            let remaining = deadline.saturating_duration_since(Instant::now());
            let report = self.scheduler.await_all(remaining, &mut self.stop).await;
            let interrupted = report.interrupted;
            let timed_out = report.cancelled > 0;
            self.absorb(report);
            self.save().await?;

            if interrupted {
                return Err(Error::Cancelled);
            }
            if timed_out || sweeps >= self.harvester.settings.retry_sweeps {
                return Ok(());
            }
            sweeps += 1;
            if self.retry_gaps() == 0 {
                return Ok(());
            }
        }
    }

    /// Store statistics and the final snapshot; export if configured.
    async fn finalize(&mut self) -> Result<()> {
        self.state.transition(RunPhase::Finalizing);
        self.snapshot.stats = Some(self.snapshot.compute_stats());
        self.save().await?;

        if let Some(export_dir) = self.harvester.settings.export_directory.clone() {
            let snapshot = self.snapshot.clone();
            let collection_dir = self.collection_dir.clone();
            let exported = tokio::task::spawn_blocking(move || {
                export_collection(&snapshot, &collection_dir, &export_dir)
            })
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))
            .and_then(|result| result);

            match exported {
                Ok(path) => tracing::info!("Exported @{} to {}", self.key, path.display()),
                Err(e) => tracing::warn!("Export of @{} failed: {}", self.key, e),
            }
        }
        Ok(())
    }

    /// After a failure: stop downloads, keep finished outcomes, save what we have.
    async fn salvage(&mut self) {
        let report = self.scheduler.cancel_all().await;
        self.absorb(report);

        // Never overwrite a snapshot that could not be read
        if self.loaded {
            if let Err(e) = self.save().await {
                tracing::warn!("Could not save progress of @{}: {}", self.key, e);
            }
        }
    }

    /// Append records not seen before; returns their indices.
    fn append(&mut self, records: Vec<Record>) -> Vec<usize> {
        let mut added = Vec::new();
        for record in records {
            let id = record.id();
            if self.index.contains_key(&id) {
                continue;
            }
            let i = self.snapshot.records.len();
            self.index.insert(id, i);
            self.snapshot.records.push(record);
            added.push(i);
        }
        added
    }

    /// Run extraction for one record and schedule its eligible assets.
    fn process_record(&mut self, i: usize) {
        let assets = extract_assets(&self.snapshot.records[i]);
        if !assets.is_empty() {
            tracing::debug!(
                "Found {} media items in tweet {}",
                assets.len(),
                assets[0].record_id
            );
        }
        for asset in &assets {
            self.state.asset_found();
            self.schedule(asset);
        }
        // processed means scheduled, not downloaded
        self.snapshot.records[i].assets_processed = true;
    }

    /// Schedule one asset if the ledger allows it. Returns whether a download was queued.
    fn schedule(&mut self, asset: &AssetRef) -> bool {
        let key = asset.key();
        let ledger = &mut self.snapshot.retry_ledger;

        if !ledger.eligible(&key.record_id, &key.url) || self.scheduler.is_in_flight(&key) {
            return false;
        }

        let path = match asset_path(&self.collection_dir, asset) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping asset {}: {}", asset.url, e);
                return false;
            }
        };

        if ledger.already_on_disk(&key, &path) {
            tracing::debug!("Already downloaded: {}", path.display());
            self.state.asset_downloaded();
            return false;
        }

        // Until an outcome arrives the entry keeps the asset on the retry list
        ledger.register(&key.record_id, &key.url);
        self.scheduler.enqueue(asset, path);
        true
    }

    /// Asset reference for a ledger key, re-derived from its record.
    fn find_asset(&self, key: &AssetKey) -> Option<AssetRef> {
        let i = *self.index.get(&key.record_id)?;
        extract_assets(&self.snapshot.records[i])
            .into_iter()
            .find(|asset| asset.url == key.url)
    }

    fn absorb(&mut self, report: DrainReport) {
        if report.cancelled > 0 {
            tracing::warn!(
                "{} download(s) for @{} left for the next run",
                report.cancelled,
                self.key
            );
        }
        self.apply(report.outcomes);
    }

    /// Record finished downloads in the ledger.
    fn apply(&mut self, outcomes: Vec<DownloadOutcome>) {
        if outcomes.is_empty() {
            return;
        }
        let ledger = &mut self.snapshot.retry_ledger;
        for outcome in outcomes {
            let DownloadOutcome { key, path, result } = outcome;
            ledger.record_attempt(&key.record_id, &key.url);
            match result {
                Ok(bytes) => {
                    ledger.record_outcome(&key.record_id, &key.url, true);
                    tracing::debug!("Downloaded {} ({} bytes)", path.display(), bytes);
                    self.state.asset_downloaded();
                }
                Err(e) => {
                    ledger.record_outcome(&key.record_id, &key.url, false);
                    tracing::warn!("Error downloading image from @{}: {}", self.key, e);
                    self.state.asset_failed(&e);
                }
            }
        }
        self.state.flush();
    }

    fn sync_progress(&mut self) {
        self.state.update_progress(
            self.snapshot.records.len(),
            self.snapshot.pages_fetched,
            self.snapshot.cursor.as_deref(),
            self.snapshot.completion_flag,
        );
    }

    async fn save(&mut self) -> Result<()> {
        self.snapshot.touch();
        self.harvester.store.save(&self.key, &self.snapshot).await
    }
}
