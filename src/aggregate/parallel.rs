use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::aggregate::{Progress, RollingWindow};
use crate::domain::VersionMarker;
use crate::events::{Listeners, Subscription};
use crate::fetcher::{ConditionalFetcher, FetchResult};

pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// One resource to fetch as part of a fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTarget {
    pub url: String,
    pub known_version: Option<VersionMarker>,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            known_version: None,
        }
    }

    pub fn with_version(mut self, marker: Option<VersionMarker>) -> Self {
        self.known_version = marker;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub completed: usize,
    pub data: usize,
    pub unmodified: usize,
    pub failed: usize,
    /// Items handed to the window, before truncation
    pub merged: usize,
}

pub struct Aggregator {
    fetcher: Arc<ConditionalFetcher>,
    semaphore: Arc<Semaphore>,
    progress: Listeners<Progress>,
}

impl Aggregator {
    pub fn new(fetcher: Arc<ConditionalFetcher>) -> Self {
        Self::with_workers(fetcher, DEFAULT_MAX_CONCURRENT)
    }

    pub fn with_workers(fetcher: Arc<ConditionalFetcher>, workers: usize) -> Self {
        Self {
            fetcher,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            progress: Listeners::new(),
        }
    }

    pub fn fetcher(&self) -> &Arc<ConditionalFetcher> {
        &self.fetcher
    }

    pub fn on_progress<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress.subscribe(handler)
    }

    pub fn remove_progress_listener(&self, subscription: Subscription) -> bool {
        self.progress.unsubscribe(subscription)
    }

    /// Runs `work` once per input with bounded concurrency and hands each
    /// output to `on_result` in completion order.
    ///
    /// Progress is published once up front and after every completion.
    /// Dropping the returned future aborts all outstanding work.
    pub async fn run<I, R, F, Fut>(&self, inputs: Vec<I>, work: F, mut on_result: impl FnMut(R)) -> Progress
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(Arc<ConditionalFetcher>, I) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
    {
        let mut progress = Progress::new(inputs.len());
        self.progress.publish(&progress);

        let mut tasks = JoinSet::new();
        for input in inputs {
            let semaphore = self.semaphore.clone();
            let job = work(self.fetcher.clone(), input);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                job.await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => on_result(result),
                Err(e) => tracing::error!("Task join error: {}", e),
            }

            progress.completed += 1;
            self.progress.publish(&progress);
        }

        progress
    }

    /// Fetches every target as a JSON array of `T` and merges each arriving
    /// batch into `window`.
    ///
    /// A target that fails contributes nothing; its siblings carry on.
    pub async fn fan_out<T>(&self, targets: Vec<FetchTarget>, window: &mut RollingWindow<T>) -> AggregateReport
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.fan_out_with(targets, |batch: Vec<T>| {
            window.merge(batch);
        })
        .await
    }

    /// [`fan_out`](Self::fan_out) with a caller-supplied merge step.
    pub async fn fan_out_with<T>(&self, targets: Vec<FetchTarget>, mut merge: impl FnMut(Vec<T>)) -> AggregateReport
    where
        T: DeserializeOwned + Send + 'static,
    {
        let mut report = AggregateReport::default();

        let progress = self
            .run(
                targets,
                |fetcher, target| async move {
                    let result = fetcher
                        .fetch::<Vec<T>>(&target.url, target.known_version)
                        .await;
                    (target.url, result)
                },
                |(url, result): (String, FetchResult<Vec<T>>)| match result {
                    FetchResult::Data(items) => {
                        report.data += 1;
                        report.merged += items.len();
                        merge(items);
                    }
                    FetchResult::Unmodified => {
                        tracing::debug!("{} unchanged", url);
                        report.unmodified += 1;
                    }
                    FetchResult::Failed(e) => {
                        tracing::warn!("Skipping {}: {}", url, e);
                        report.failed += 1;
                    }
                },
            )
            .await;

        report.completed = progress.completed;
        tracing::info!(
            "Fan-out complete: {} targets, {} items merged, {} failed",
            report.completed,
            report.merged,
            report.failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::cache::ResponseCache;
    use crate::fetcher::conditional::tests::StubTransport;
    use crate::fetcher::{FetchRequest, RawResponse, Transport, TransportError};

    fn aggregator(transport: Arc<dyn Transport + Send + Sync>, workers: usize) -> Aggregator {
        let fetcher = ConditionalFetcher::new(transport, Arc::new(ResponseCache::new()));
        Aggregator::with_workers(Arc::new(fetcher), workers)
    }

    /// Answers every request with `[<n>]` after a short delay, tracking how
    /// many requests are in flight at once.
    #[derive(Default)]
    struct SlowTransport {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, request: &FetchRequest) -> Result<RawResponse, TransportError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let n = request.url.rsplit('/').next().unwrap_or("0").to_string();
            Ok(RawResponse {
                status: 200,
                body: format!("[{}]", n).into_bytes(),
                ..RawResponse::default()
            })
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(SlowTransport::default());
        let aggregator = aggregator(transport.clone(), 2);
        let targets = (0..6)
            .map(|i| FetchTarget::new(format!("https://example.com/items/{}", i)))
            .collect();

        let mut window = RollingWindow::new(50);
        let report = aggregator.fan_out::<u32>(targets, &mut window).await;

        assert_eq!(report.completed, 6);
        assert_eq!(report.data, 6);
        assert_eq!(window.len(), 6);
        assert!(transport.peak.load(Ordering::SeqCst) <= 2);
        let mut ids: Vec<u32> = window.items().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_failed_target_does_not_abort_siblings() {
        let transport = Arc::new(StubTransport::default());
        transport.respond("https://example.com/a", 200, &[], "[1, 2]");
        transport.respond("https://example.com/b", 500, &[], "boom");
        transport.fail("https://example.com/c", "connection refused");
        transport.respond("https://example.com/d", 304, &[], "");
        transport.respond("https://example.com/e", 200, &[], "not json");
        let aggregator = aggregator(transport, 2);

        let targets = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|p| FetchTarget::new(format!("https://example.com/{}", p)))
            .collect();
        let mut window = RollingWindow::new(50);
        let report = aggregator.fan_out::<u32>(targets, &mut window).await;

        assert_eq!(
            report,
            AggregateReport {
                completed: 5,
                data: 1,
                unmodified: 1,
                failed: 3,
                merged: 2,
            }
        );
        assert_eq!(window.items(), &[1, 2]);
    }

    #[tokio::test]
    async fn test_progress_published_after_every_completion() {
        let transport = Arc::new(StubTransport::default());
        for p in ["a", "b", "c", "d", "e"] {
            transport.respond(&format!("https://example.com/{}", p), 200, &[], "[]");
        }
        let aggregator = aggregator(transport, 2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        aggregator.on_progress(move |p| sink.lock().unwrap().push(p.fraction()));

        let targets = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|p| FetchTarget::new(format!("https://example.com/{}", p)))
            .collect();
        aggregator
            .fan_out::<u32>(targets, &mut RollingWindow::new(50))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0]);
    }

    #[tokio::test]
    async fn test_window_capped_across_targets() {
        let transport = Arc::new(StubTransport::default());
        let batch: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let body = format!("[{}]", batch.join(","));
        transport.respond("https://example.com/a", 200, &[], &body);
        transport.respond("https://example.com/b", 200, &[], &body);
        let aggregator = aggregator(transport, 2);

        let mut window = RollingWindow::new(50);
        let targets = vec![
            FetchTarget::new("https://example.com/a"),
            FetchTarget::new("https://example.com/b"),
        ];
        let report = aggregator.fan_out::<u32>(targets, &mut window).await;

        assert_eq!(report.merged, 60);
        assert_eq!(window.len(), 50);
        // Second batch sits in front; the oldest 10 of the first were dropped.
        assert_eq!(&window.items()[..30], &(0..30).collect::<Vec<u32>>()[..]);
        assert_eq!(&window.items()[30..], &(0..20).collect::<Vec<u32>>()[..]);
    }

    #[tokio::test]
    async fn test_dropping_fan_out_aborts_children() {
        let transport = Arc::new(StubTransport::hanging());
        let aggregator = aggregator(transport.clone(), 2);
        let fetcher = aggregator.fetcher().clone();

        let targets = (0..4)
            .map(|i| FetchTarget::new(format!("https://example.com/{}", i)))
            .collect();
        let mut window = RollingWindow::<u32>::new(50);
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            aggregator.fan_out(targets, &mut window),
        )
        .await;
        assert!(outcome.is_err());

        for _ in 0..100 {
            if Arc::strong_count(&fetcher) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        // Only the aggregator and this test still hold the fetcher.
        assert_eq!(Arc::strong_count(&fetcher), 2);
        assert_eq!(transport.request_count(), 2);
        assert!(window.is_empty());
    }
}
