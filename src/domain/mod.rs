pub mod eonet;
pub mod github;
pub mod marker;

pub use eonet::{Category, NaturalEvent};
pub use github::{Event, Repository, SearchResponse};
pub use marker::{MarkerUpdate, VersionMarker};
