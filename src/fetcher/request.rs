use serde_json::Value;
use url::Url;

use crate::fetcher::FetchError;

/// Builds `base` + `endpoint` with `query` appended.
///
/// Query values must be JSON scalars. Anything else is rejected here, before
/// a request exists.
pub fn build_url(base: &str, endpoint: &str, query: &[(&str, Value)]) -> Result<Url, FetchError> {
    let mut url = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base, e)))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(base.to_string()))?;
        segments.pop_if_empty();
        segments.extend(endpoint.split('/').filter(|s| !s.is_empty()));
    }

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    return Err(FetchError::InvalidParameter(format!("{}={}", key, value)));
                }
            };
            pairs.append_pair(key, &rendered);
        }
    }

    Ok(url)
}
