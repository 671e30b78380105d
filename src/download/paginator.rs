//! Sequential, rate-limited pagination of one collection's feed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::{sleep_until, Instant};

use crate::api::FeedSource;
use crate::download::control::StopSignal;
use crate::error::{Error, Result};
use crate::record::{oldest_id, Record};

/// One fetched page.
#[derive(Debug)]
pub struct Page {
    pub records: Vec<Record>,
    /// Oldest upstream id on the page; `None` for an empty page.
    pub new_cursor: Option<String>,
    /// The feed has no records at or below the requested cursor.
    pub exhausted: bool,
}

/// Minimum pause between two requests for the same collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageDelay {
    pub base: Duration,
    pub jitter: Duration,
}

impl PageDelay {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    fn sample(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.base + Duration::from_millis(extra)
    }
}

/// Drives fetches against a [`FeedSource`] for one collection.
pub struct Paginator {
    source: Arc<dyn FeedSource>,
    key: String,
    delay: PageDelay,
    next_allowed: Option<Instant>,
}

impl Paginator {
    pub fn new(source: Arc<dyn FeedSource>, key: &str, delay: PageDelay) -> Self {
        Self {
            source,
            key: key.to_string(),
            delay,
            next_allowed: None,
        }
    }

    /// Fetch one page at `cursor`.
    pub async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page> {
        match cursor {
            Some(cursor) => tracing::info!("Fetching tweets for {} with max_id: {}", self.key, cursor),
            None => tracing::info!("Fetching tweets for {}", self.key),
        }

        let records = self.source.fetch_feed(&self.key, cursor).await?;
        let exhausted = records.is_empty();
        let new_cursor = oldest_id(&records);

        Ok(Page {
            records,
            new_cursor,
            exhausted,
        })
    }

    /// Wait out the inter-request delay, then fetch the next page.
    ///
    /// Both the wait and the request are abandoned when `stop` fires.
    pub async fn next_page(&mut self, cursor: Option<&str>, stop: &mut StopSignal) -> Result<Page> {
        if stop.is_stopped() {
            return Err(Error::Cancelled);
        }

        let not_before = self.next_allowed.unwrap_or_else(Instant::now);
        let page = tokio::select! {
            page = async {
                sleep_until(not_before).await;
                self.fetch_page(cursor).await
            } => page,
            _ = stop.stopped() => return Err(Error::Cancelled),
        };

        self.next_allowed = Some(Instant::now() + self.delay.sample());
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::control::stop_channel;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct Scripted {
        pages: Mutex<Vec<Vec<Record>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl FeedSource for Scripted {
        async fn fetch_feed(&self, _key: &str, cursor: Option<&str>) -> Result<Vec<Record>> {
            self.cursors.lock().unwrap().push(cursor.map(str::to_string));
            let mut pages = self.pages.lock().unwrap();
            Ok(if pages.is_empty() { Vec::new() } else { pages.remove(0) })
        }

        async fn total_count(&self, _key: &str) -> Result<Option<u64>> {
            Ok(None)
        }
    }

    fn records(ids: &[&str]) -> Vec<Record> {
        ids.iter()
            .map(|id| Record::from_value(json!({ "id_str": id })))
            .collect()
    }

    #[tokio::test]
    async fn test_cursor_is_minimum_id() {
        let source = Arc::new(Scripted {
            pages: Mutex::new(vec![records(&["105", "99", "101"])]),
            cursors: Mutex::new(Vec::new()),
        });
        let paginator = Paginator::new(source.clone(), "jack", PageDelay::default());

        let page = paginator.fetch_page(Some("110")).await.unwrap();
        assert_eq!(page.new_cursor.as_deref(), Some("99"));
        assert!(!page.exhausted);

        let page = paginator.fetch_page(Some("99")).await.unwrap();
        assert!(page.exhausted);
        assert!(page.new_cursor.is_none());

        assert_eq!(
            *source.cursors.lock().unwrap(),
            vec![Some("110".to_string()), Some("99".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforces_delay_between_requests() {
        let source = Arc::new(Scripted {
            pages: Mutex::new(vec![records(&["2"]), records(&["1"])]),
            cursors: Mutex::new(Vec::new()),
        });
        let mut paginator = Paginator::new(
            source,
            "jack",
            PageDelay::new(Duration::from_secs(1), Duration::ZERO),
        );
        let mut stop = StopSignal::never();

        let start = Instant::now();
        paginator.next_page(None, &mut stop).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(10));

        paginator.next_page(Some("2"), &mut stop).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_stop_aborts_before_request() {
        let source = Arc::new(Scripted {
            pages: Mutex::new(vec![records(&["1"])]),
            cursors: Mutex::new(Vec::new()),
        });
        let mut paginator = Paginator::new(source.clone(), "jack", PageDelay::default());
        let (handle, mut stop) = stop_channel();
        handle.stop();

        let result = paginator.next_page(None, &mut stop).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(source.cursors.lock().unwrap().is_empty());
    }
}
