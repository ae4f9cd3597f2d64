pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "freshet")]
#[command(about = "Conditional, cached fetching of GitHub activity and EONET events", long_about = None)]
pub struct Cli {
    /// Maximum number of concurrent fetches (overrides the config file)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Path to the SQLite database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch recent events of popular repositories
    Activity {
        /// Search repositories written in this language
        #[arg(short, long)]
        language: Option<String>,
        /// How many search hits to follow
        #[arg(short, long)]
        top: Option<u32>,
        /// Follow a single repository (owner/name) instead of searching
        #[arg(short, long)]
        repo: Option<String>,
    },
    /// Download EONET categories with their events
    Categories {
        /// Look back this many days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Refresh activity periodically until interrupted
    Watch {
        /// Refresh interval (e.g., "30s", "5m", "1h")
        #[arg(short, long, default_value = "5m")]
        interval: String,

        /// Wait one interval before the first refresh
        #[arg(long)]
        no_initial_refresh: bool,
    },
    /// List persisted version markers
    Markers,
    /// Forget persisted markers and snapshots
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_activity_flags() {
        let cli = Cli::parse_from(["freshet", "--workers", "4", "activity", "--repo", "org/repo"]);
        assert_eq!(cli.workers, Some(4));
        match cli.command {
            Commands::Activity { repo, language, top } => {
                assert_eq!(repo.as_deref(), Some("org/repo"));
                assert!(language.is_none());
                assert!(top.is_none());
            }
            _ => panic!("expected activity"),
        }
    }

    #[test]
    fn test_watch_defaults_to_five_minutes() {
        let cli = Cli::parse_from(["freshet", "watch", "--db", "/tmp/f.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/f.db")));
        match cli.command {
            Commands::Watch {
                interval,
                no_initial_refresh,
            } => {
                assert_eq!(interval, "5m");
                assert!(!no_initial_refresh);
            }
            _ => panic!("expected watch"),
        }
    }
}
