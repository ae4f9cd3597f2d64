pub mod conditional;
pub mod http_transport;
pub mod request;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::VersionMarker;

pub use conditional::{CachePolicy, ConditionalFetcher, FetchHandle};
pub use http_transport::HttpTransport;
pub use request::build_url;

/// Header the server uses to report the resource version.
pub const LAST_MODIFIED: &str = "last-modified";

/// Header used to send a known version back to the server.
pub const DEFAULT_CONDITIONAL_HEADER: &str = "If-Modified-Since";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    /// Fresh payload, from the network or the response cache
    Data(T),
    /// Server reported no change (3xx)
    Unmodified,
    Failed(FetchError),
}

impl<T> FetchResult<T> {
    pub fn data(self) -> Option<T> {
        match self {
            FetchResult::Data(payload) => Some(payload),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request failed with status {status}")]
    RequestFailed { status: u16, body: Option<Vec<u8>> },

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid query parameter: {0}")]
    InvalidParameter(String),
}

/// A GET request, optionally conditional on a known version.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub known_version: Option<VersionMarker>,
}

impl FetchRequest {
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

/// Whatever the server answered, before classification.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lower-case.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// No response was received at all.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport {
    async fn send(&self, request: &FetchRequest) -> Result<RawResponse, TransportError>;
}
