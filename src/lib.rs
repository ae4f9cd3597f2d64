//! # Freshet
//!
//! Conditional, cached HTTP fetching of JSON resources, aggregated from many
//! sources at once.
//!
//! ## Architecture
//!
//! ```text
//! Transport → ConditionalFetcher (+ ResponseCache) → Aggregator → RollingWindow → Store
//! ```
//!
//! - [`fetcher`]: conditional GET with version markers and typed decoding
//! - [`cache`]: in-memory response bodies keyed by URL
//! - [`aggregate`]: bounded fan-out, progress and the rolling window
//! - [`sources`]: the GitHub activity and EONET flows
//! - [`store`]: SQLite persistence for markers and snapshots
//!
//! ## Quick Start
//!
//! ```bash
//! # Recent events of the top five Swift repositories
//! freshet activity
//!
//! # One repository, refreshed every minute
//! freshet activity --repo apple/swift
//! freshet watch --interval 1m
//!
//! # Natural events by category
//! freshet categories --days 30
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, cache, fetcher, aggregator and the two data flows.
pub mod app;

/// Fan-out over many targets with bounded concurrency.
///
/// - [`Aggregator`](aggregate::Aggregator): semaphore-bounded `JoinSet` runner
/// - [`RollingWindow`](aggregate::RollingWindow): capped, newest-first merge target
/// - [`Progress`](aggregate::Progress): completed / total
pub mod aggregate;

/// Response cache shared by every fetch.
pub mod cache;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/freshet/config.toml`.
pub mod config;

/// Wire models for GitHub and EONET, plus version markers.
pub mod domain;

/// Listener registry used for marker and progress notifications.
pub mod events;

/// HTTP fetching with conditional request support.
///
/// - [`Transport`](fetcher::Transport): async trait for the raw GET
/// - [`HttpTransport`](fetcher::HttpTransport): reqwest-based implementation
/// - [`ConditionalFetcher`](fetcher::ConditionalFetcher): cache, marker and decode logic
pub mod fetcher;

pub mod sources;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

/// Foreground refresh loop for `freshet watch`.
pub mod watch;
