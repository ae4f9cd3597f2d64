//! Periodic activity refresh in the foreground.
//!
//! Runs the activity flow on a fixed interval until Ctrl-C or SIGTERM.

use std::time::Duration;

use chrono::Local;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{AppContext, Result};
use crate::sources::ActivityUpdate;

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Refresh interval in seconds (default: 300 = 5 minutes)
    pub interval_secs: u64,
    /// Whether to refresh immediately on start
    pub refresh_on_start: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            refresh_on_start: true,
        }
    }
}

impl WatchConfig {
    /// Parse interval string like "90s", "5m", "1h", "1d"
    pub fn parse_interval(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let (digits, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((idx, _)) => s.split_at(idx),
            None => (s.as_str(), "s"),
        };

        let multiplier = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            "d" => 86400,
            _ => {
                return Err(format!(
                    "Invalid interval: {}. Use format like '30s', '5m', '1h'",
                    s
                ))
            }
        };

        let value = digits
            .parse::<u64>()
            .map_err(|_| format!("Invalid interval: {}", s))?;
        if value == 0 {
            return Err("Interval must be greater than zero".to_string());
        }

        value
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Interval too large: {}", s))
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs % 86400 == 0 {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs % 3600 == 0 {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }
}

pub struct Watcher<'a> {
    ctx: &'a AppContext,
    config: WatchConfig,
}

impl<'a> Watcher<'a> {
    pub fn new(ctx: &'a AppContext, config: WatchConfig) -> Self {
        Self { ctx, config }
    }

    pub async fn run(&self) -> Result<()> {
        println!(
            "Watching activity every {} (Ctrl-C to stop)",
            WatchConfig::format_interval(self.config.interval_secs)
        );

        let mut timer = interval(Duration::from_secs(self.config.interval_secs));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.config.refresh_on_start {
            // The first tick completes immediately.
            timer.tick().await;
        }

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    // A shutdown signal cancels an in-flight refresh.
                    tokio::select! {
                        _ = &mut shutdown => break,
                        result = self.ctx.activity.refresh() => self.report(result),
                    }
                }
            }
        }

        println!("Stopped watching");
        Ok(())
    }

    fn report(&self, result: Result<ActivityUpdate>) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        match result {
            Ok(update) => println!(
                "[{}] {} repos, {} new events, {} unchanged, {} errors",
                timestamp,
                update.repos.len(),
                update.report.merged,
                update.report.unmodified,
                update.report.failed
            ),
            Err(e) => {
                tracing::error!("Refresh failed: {}", e);
                println!("[{}] Refresh failed: {}", timestamp, e);
            }
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
                return;
            }
            Err(e) => tracing::warn!("Could not install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
