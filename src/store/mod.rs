pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::Result;
use crate::domain::VersionMarker;

pub use sqlite::SqliteStore;

/// Session-to-session state: one version marker per resource and named JSON
/// snapshots of decoded collections.
pub trait Store {
    // Marker operations
    fn load_marker(&self, resource: &str) -> Result<Option<VersionMarker>>;
    fn save_marker(&self, resource: &str, marker: &VersionMarker) -> Result<()>;
    fn list_markers(&self) -> Result<Vec<(String, VersionMarker)>>;

    // Snapshot operations
    fn load_snapshot(&self, name: &str) -> Result<Option<String>>;
    fn save_snapshot(&self, name: &str, body: &str) -> Result<()>;

    /// Forget every marker and snapshot.
    fn reset(&self) -> Result<()>;

    fn load_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.load_snapshot(name)? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let body = serde_json::to_string(value)?;
        self.save_snapshot(name, &body)
    }
}
