//! Cache-first, version-aware fetching of JSON resources.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::cache::{is_success, ResponseCache};
use crate::domain::{MarkerUpdate, VersionMarker};
use crate::events::{Listeners, Subscription};
use crate::fetcher::{FetchError, FetchRequest, FetchResult, RawResponse, Transport, LAST_MODIFIED};

/// Whether a cached body may answer a request without asking the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Any cached body for the URL is returned as-is.
    #[default]
    PreferCache,
    /// Always ask the server, sending the known version if there is one.
    Revalidate,
}

pub struct ConditionalFetcher {
    transport: Arc<dyn Transport + Send + Sync>,
    cache: Arc<ResponseCache>,
    policy: CachePolicy,
    markers: Listeners<MarkerUpdate>,
}

impl ConditionalFetcher {
    pub fn new(transport: Arc<dyn Transport + Send + Sync>, cache: Arc<ResponseCache>) -> Self {
        Self {
            transport,
            cache,
            policy: CachePolicy::default(),
            markers: Listeners::new(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Register for version markers seen on successful or redirect responses.
    pub fn on_marker<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MarkerUpdate) + Send + Sync + 'static,
    {
        self.markers.subscribe(handler)
    }

    pub fn remove_marker_listener(&self, subscription: Subscription) -> bool {
        self.markers.unsubscribe(subscription)
    }

    /// Fetch `url` and decode a 2xx body as JSON `T`.
    ///
    /// The body is cached only once it decodes, so a payload the caller cannot
    /// read never shadows later responses.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        known_version: Option<VersionMarker>,
    ) -> FetchResult<T> {
        self.fetch_with(url, known_version, |body| {
            serde_json::from_slice(body).map_err(|e| FetchError::Deserialization(e.to_string()))
        })
        .await
    }

    /// Same pipeline as [`fetch`](Self::fetch) without decoding.
    pub async fn fetch_bytes(
        &self,
        url: &str,
        known_version: Option<VersionMarker>,
    ) -> FetchResult<Vec<u8>> {
        self.fetch_with(url, known_version, |body| Ok(body.to_vec()))
            .await
    }

    async fn fetch_with<T, D>(
        &self,
        url: &str,
        known_version: Option<VersionMarker>,
        decode: D,
    ) -> FetchResult<T>
    where
        D: Fn(&[u8]) -> Result<T, FetchError>,
    {
        if self.policy == CachePolicy::PreferCache {
            if let Some(body) = self.cache.lookup(url) {
                tracing::debug!("Serving {} from response cache", url);
                return match decode(&body) {
                    Ok(payload) => FetchResult::Data(payload),
                    Err(e) => FetchResult::Failed(e),
                };
            }
        }

        let request = FetchRequest::new(url).with_version(known_version);
        let response = match self.transport.send(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("No response from {}: {}", url, e);
                return FetchResult::Failed(FetchError::Transport(e.0));
            }
        };

        self.publish_marker(url, &response);
        self.classify(url, response, decode)
    }

    fn publish_marker(&self, url: &str, response: &RawResponse) {
        if !(200..400).contains(&response.status) {
            return;
        }

        if let Some(value) = response.header(LAST_MODIFIED) {
            self.markers.publish(&MarkerUpdate {
                url: url.to_string(),
                marker: VersionMarker::new(value),
            });
        }
    }

    fn classify<T, D>(&self, url: &str, response: RawResponse, decode: D) -> FetchResult<T>
    where
        D: Fn(&[u8]) -> Result<T, FetchError>,
    {
        match response.status {
            status if is_success(status) => match decode(&response.body) {
                Ok(payload) => {
                    self.cache.store(url, &response.body, status);
                    FetchResult::Data(payload)
                }
                Err(e) => {
                    tracing::warn!("Could not decode body from {}: {}", url, e);
                    FetchResult::Failed(e)
                }
            },
            300..=399 => {
                tracing::debug!("{} not modified", url);
                FetchResult::Unmodified
            }
            status => {
                let body = (!response.body.is_empty()).then_some(response.body);
                FetchResult::Failed(FetchError::RequestFailed { status, body })
            }
        }
    }
}

/// A fetch running on its own task.
pub struct FetchHandle<T> {
    task: JoinHandle<FetchResult<T>>,
}

impl<T> FetchHandle<T> {
    /// Abort the request. Neither a result nor a marker is published afterwards.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Wait for the result; `None` if the fetch was cancelled.
    pub async fn join(self) -> Option<FetchResult<T>> {
        match self.task.await {
            Ok(result) => Some(result),
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!("Fetch task failed: {}", e);
                }
                None
            }
        }
    }
}

impl ConditionalFetcher {
    pub fn spawn_fetch<T>(
        self: &Arc<Self>,
        url: String,
        known_version: Option<VersionMarker>,
    ) -> FetchHandle<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let fetcher = Arc::clone(self);
        let task = tokio::spawn(async move { fetcher.fetch(&url, known_version).await });
        FetchHandle { task }
    }
}
