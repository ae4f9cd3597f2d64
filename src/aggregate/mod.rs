//! Bounded fan-out over many resources, merged into one rolling window.

pub mod parallel;
pub mod progress;
pub mod window;

pub use parallel::{AggregateReport, Aggregator, FetchTarget, DEFAULT_MAX_CONCURRENT};
pub use progress::Progress;
pub use window::{RollingWindow, DEFAULT_WINDOW_CAPACITY};
