//! Data flows built on the fetch core.

pub mod eonet;
pub mod github;

pub use eonet::Eonet;
pub use github::{ActivityUpdate, GitHubActivity};
