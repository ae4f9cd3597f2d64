//! Repository activity: popular repositories fanned out to their event
//! timelines, merged into one most-recent-first window.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use url::Url;

use crate::aggregate::{AggregateReport, Aggregator, FetchTarget, RollingWindow};
use crate::app::Result;
use crate::config::GitHubConfig;
use crate::domain::{Event, SearchResponse};
use crate::events::Subscription;
use crate::fetcher::{build_url, ConditionalFetcher, FetchError, FetchResult};
use crate::store::Store;

/// Snapshot name of the persisted activity window.
pub const ACTIVITY_SNAPSHOT: &str = "activity";

#[derive(Debug, Clone)]
pub struct ActivityUpdate {
    pub repos: Vec<String>,
    pub report: AggregateReport,
    /// Window contents after the merge, newest first
    pub events: Vec<Event>,
}

pub struct GitHubActivity<S: Store> {
    config: GitHubConfig,
    aggregator: Arc<Aggregator>,
    store: Arc<S>,
    window_capacity: usize,
}

/// Removes a marker listener when dropped, including on cancellation.
struct MarkerListenerGuard<'a> {
    fetcher: &'a ConditionalFetcher,
    subscription: Subscription,
}

impl Drop for MarkerListenerGuard<'_> {
    fn drop(&mut self) {
        self.fetcher.remove_marker_listener(self.subscription);
    }
}

impl<S: Store + Send + Sync + 'static> GitHubActivity<S> {
    pub fn new(
        config: GitHubConfig,
        aggregator: Arc<Aggregator>,
        store: Arc<S>,
        window_capacity: usize,
    ) -> Self {
        Self {
            config,
            aggregator,
            store,
            window_capacity,
        }
    }

    pub fn marker_resource(repo: &str) -> String {
        format!("events:{}", repo)
    }

    pub fn search_url(&self) -> std::result::Result<Url, FetchError> {
        build_url(
            &self.config.api_base,
            "/search/repositories",
            &[
                ("q", json!(format!("language:{}", self.config.language))),
                ("per_page", json!(self.config.per_page)),
            ],
        )
    }

    pub fn events_url(&self, repo: &str) -> std::result::Result<Url, FetchError> {
        if repo.split('/').filter(|part| !part.is_empty()).count() != 2 {
            return Err(FetchError::InvalidParameter(format!("repo={}", repo)));
        }
        build_url(&self.config.api_base, &format!("/repos/{}/events", repo), &[])
    }

    /// Repositories to follow: the configured one, or the top search hits.
    pub async fn repositories(&self) -> Vec<String> {
        if let Some(repo) = &self.config.repo {
            return vec![repo.clone()];
        }

        let url = match self.search_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build search request: {}", e);
                return Vec::new();
            }
        };

        match self
            .aggregator
            .fetcher()
            .fetch::<SearchResponse>(url.as_str(), None)
            .await
        {
            FetchResult::Data(response) => response
                .items
                .into_iter()
                .map(|repo| repo.full_name)
                .collect(),
            FetchResult::Unmodified => Vec::new(),
            FetchResult::Failed(e) => {
                tracing::warn!("Repository search failed: {}", e);
                Vec::new()
            }
        }
    }

    /// The persisted window, or an empty one on first run.
    pub fn load_window(&self) -> Result<RollingWindow<Event>> {
        let events: Vec<Event> = self.store.load_json(ACTIVITY_SNAPSHOT)?.unwrap_or_default();
        Ok(RollingWindow::from_items(self.window_capacity, events))
    }

    pub async fn refresh(&self) -> Result<ActivityUpdate> {
        if let Some(repo) = &self.config.repo {
            self.events_url(repo)?;
        }

        let repos = self.repositories().await;
        let fetcher = self.aggregator.fetcher();

        let mut targets = Vec::with_capacity(repos.len());
        let mut resources = HashMap::new();
        for repo in &repos {
            let url = match self.events_url(repo) {
                Ok(url) => url.to_string(),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", repo, e);
                    continue;
                }
            };

            let resource = Self::marker_resource(repo);
            let marker = self.store.load_marker(&resource)?;
            // Event timelines are always revalidated with the server.
            fetcher.cache().invalidate(&url);

            targets.push(FetchTarget::new(url.clone()).with_version(marker));
            resources.insert(url, resource);
        }

        let store = self.store.clone();
        let subscription = fetcher.on_marker(move |update| {
            if let Some(resource) = resources.get(&update.url) {
                if let Err(e) = store.save_marker(resource, &update.marker) {
                    tracing::warn!("Could not persist marker for {}: {}", resource, e);
                }
            }
        });
        let _guard = MarkerListenerGuard {
            fetcher: fetcher.as_ref(),
            subscription,
        };

        let mut window = self.load_window()?;
        let report = self
            .aggregator
            .fan_out_with(targets, |batch: Vec<Event>| {
                window.merge_unique_by(batch, |event| event.id.clone());
            })
            .await;

        if report.data > 0 {
            self.store.save_json(ACTIVITY_SNAPSHOT, &window.items())?;
        }

        Ok(ActivityUpdate {
            repos,
            report,
            events: window.into_vec(),
        })
    }
}
