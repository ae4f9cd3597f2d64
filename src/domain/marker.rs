use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-supplied token describing the last-modified state of a
/// resource, such as a `Last-Modified` header value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionMarker(String);

impl VersionMarker {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionMarker {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for VersionMarker {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Published whenever a response carries a fresh version marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerUpdate {
    pub url: String,
    pub marker: VersionMarker,
}
