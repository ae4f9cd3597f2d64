use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::app::Result;
use crate::config::HttpConfig;
use crate::fetcher::{FetchRequest, RawResponse, Transport, TransportError};

pub struct HttpTransport {
    client: Client,
    conditional_header: HeaderName,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        let conditional_header = HeaderName::from_bytes(config.conditional_header.as_bytes())
            .map_err(|e| {
                crate::app::FreshetError::Other(format!(
                    "Invalid conditional header {:?}: {}",
                    config.conditional_header, e
                ))
            })?;

        Ok(Self {
            client,
            conditional_header,
        })
    }

    fn request_headers(&self, request: &FetchRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(marker) = &request.known_version {
            match HeaderValue::from_str(marker.as_str()) {
                Ok(value) => {
                    headers.insert(self.conditional_header.clone(), value);
                }
                Err(_) => {
                    tracing::warn!("Dropping unsendable version marker for {}", request.url);
                }
            }
        }

        headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> std::result::Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(&request.url)
            .headers(self.request_headers(request))
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
