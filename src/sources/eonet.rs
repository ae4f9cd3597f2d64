//! Natural events from NASA's EONET, downloaded per category.

use std::sync::Arc;

use futures::future;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::aggregate::{Aggregator, Progress};
use crate::events::Subscription;
use crate::config::EonetConfig;
use crate::domain::eonet::{filtered_events, CategoriesEnvelope, EventsEnvelope};
use crate::domain::{Category, NaturalEvent};
use crate::fetcher::{build_url, ConditionalFetcher, FetchError, FetchResult};

pub struct Eonet {
    config: EonetConfig,
    aggregator: Arc<Aggregator>,
    categories: OnceCell<Vec<Category>>,
}

/// Removes a progress listener when dropped, including on cancellation.
struct ProgressListenerGuard<'a> {
    aggregator: &'a Aggregator,
    subscription: Subscription,
}

impl Drop for ProgressListenerGuard<'_> {
    fn drop(&mut self) {
        self.aggregator.remove_progress_listener(self.subscription);
    }
}

impl Eonet {
    pub fn new(config: EonetConfig, aggregator: Arc<Aggregator>) -> Self {
        Self {
            config,
            aggregator,
            categories: OnceCell::new(),
        }
    }

    /// Category list sorted by title.
    ///
    /// The first successful download is shared by every later call; a failed
    /// download yields an empty list and is retried next time.
    pub async fn categories(&self) -> Vec<Category> {
        let result = self
            .categories
            .get_or_try_init(|| fetch_categories(self.aggregator.fetcher(), &self.config.api_base))
            .await;

        match result {
            Ok(categories) => categories.clone(),
            Err(e) => {
                tracing::warn!("Could not load EONET categories: {}", e);
                Vec::new()
            }
        }
    }

    /// Downloads the events of every category, at most the aggregator's
    /// worker count at a time, and attaches them to their categories.
    ///
    /// `on_progress` sees the running count of finished categories.
    pub async fn download(&self, on_progress: impl Fn(&Progress) + Send + Sync + 'static) -> Vec<Category> {
        let mut categories = self.categories().await;
        let days = self.config.days;

        let _guard = ProgressListenerGuard {
            aggregator: self.aggregator.as_ref(),
            subscription: self.aggregator.on_progress(on_progress),
        };
        let links: Vec<String> = categories.iter().map(|c| c.link.clone()).collect();

        self.aggregator
            .run(
                links,
                move |fetcher, link| async move { events_for(&fetcher, &link, days).await },
                |events: Vec<NaturalEvent>| {
                    for category in categories.iter_mut() {
                        let fresh = filtered_events(&events, category);
                        category.events.extend(fresh);
                    }
                },
            )
            .await;

        categories
    }
}

async fn fetch_categories(
    fetcher: &ConditionalFetcher,
    api_base: &str,
) -> Result<Vec<Category>, FetchError> {
    let url = build_url(api_base, "/categories", &[])?;

    match fetcher.fetch::<CategoriesEnvelope>(url.as_str(), None).await {
        FetchResult::Data(envelope) => {
            let mut categories = envelope.categories;
            categories.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(categories)
        }
        FetchResult::Unmodified => Err(FetchError::RequestFailed {
            status: 304,
            body: None,
        }),
        FetchResult::Failed(e) => Err(e),
    }
}

/// Open and closed events of one category, fetched concurrently.
/// Either half failing contributes no events.
pub async fn events_for(fetcher: &ConditionalFetcher, category_link: &str, days: u32) -> Vec<NaturalEvent> {
    let (open, closed) = future::join(
        events_with_status(fetcher, category_link, days, "open"),
        events_with_status(fetcher, category_link, days, "closed"),
    )
    .await;

    let mut events = open;
    events.extend(closed);
    events
}

async fn events_with_status(
    fetcher: &ConditionalFetcher,
    category_link: &str,
    days: u32,
    status: &str,
) -> Vec<NaturalEvent> {
    let url = match build_url(
        category_link,
        "",
        &[("days", json!(days)), ("status", json!(status))],
    ) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build events request for {}: {}", category_link, e);
            return Vec::new();
        }
    };

    match fetcher.fetch::<EventsEnvelope>(url.as_str(), None).await {
        FetchResult::Data(envelope) => envelope.events,
        FetchResult::Unmodified => Vec::new(),
        FetchResult::Failed(e) => {
            tracing::warn!("Skipping {} events for {}: {}", status, category_link, e);
            Vec::new()
        }
    }
}
