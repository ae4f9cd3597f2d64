use std::io::Write;

use crate::app::{AppContext, FreshetError, Result};
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::store::Store;
use crate::watch::{WatchConfig, Watcher};

/// Fold command-line overrides into the loaded config.
pub fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(workers) = cli.workers {
        config.aggregate.max_concurrent = workers;
    }

    match &cli.command {
        Commands::Activity {
            language,
            top,
            repo,
        } => {
            if let Some(language) = language {
                config.github.language = language.clone();
            }
            if let Some(top) = top {
                config.github.per_page = *top;
            }
            if repo.is_some() {
                config.github.repo = repo.clone();
            }
        }
        Commands::Categories { days: Some(days) } => {
            config.eonet.days = *days;
        }
        _ => {}
    }
}

pub async fn show_activity(ctx: &AppContext) -> Result<()> {
    let update = ctx.activity.refresh().await?;

    if update.repos.is_empty() {
        println!("No repositories to follow");
        return Ok(());
    }

    println!("Following {} repositories", update.repos.len());
    if update.events.is_empty() {
        println!("No events");
    }

    for event in &update.events {
        let date = event
            .created_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "                ".to_string());
        println!("{} {:<20} {}", date, event.actor.login, event.summary());
    }

    println!(
        "Refresh complete: {} new events, {} unchanged, {} errors",
        update.report.merged, update.report.unmodified, update.report.failed
    );
    Ok(())
}

pub async fn show_categories(ctx: &AppContext) -> Result<()> {
    let categories = ctx
        .eonet
        .download(|progress| {
            print!("\rDownloading events... {:>3}%", progress.percent());
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    if categories.is_empty() {
        println!("No categories");
        return Ok(());
    }

    for category in &categories {
        println!("{} ({})", category.title, category.events.len());
    }
    Ok(())
}

pub async fn watch(ctx: &AppContext, interval: &str, no_initial_refresh: bool) -> Result<()> {
    let interval_secs = WatchConfig::parse_interval(interval).map_err(FreshetError::Other)?;
    let config = WatchConfig {
        interval_secs,
        refresh_on_start: !no_initial_refresh,
    };

    Watcher::new(ctx, config).run().await
}

pub fn list_markers(ctx: &AppContext) -> Result<()> {
    let markers = ctx.store.list_markers()?;

    if markers.is_empty() {
        println!("No markers");
        return Ok(());
    }

    for (resource, marker) in markers {
        println!("{}\n  {}", resource, marker);
    }
    Ok(())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    ctx.store.reset()?;
    ctx.cache.clear();
    println!("Cleared markers and snapshots");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clap::Parser;

    use crate::fetcher::conditional::tests::StubTransport;
    use crate::sources::github::ACTIVITY_SNAPSHOT;
    use crate::store::SqliteStore;

    fn context(transport: Arc<StubTransport>, config: Config) -> AppContext {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        AppContext::assemble(config, store, transport)
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "freshet", "-w", "6", "activity", "--language", "rust", "--top", "3",
        ]);
        let mut config = Config::default();
        apply_overrides(&cli, &mut config);

        assert_eq!(config.aggregate.max_concurrent, 6);
        assert_eq!(config.github.language, "rust");
        assert_eq!(config.github.per_page, 3);
        assert!(config.github.repo.is_none());

        let cli = Cli::parse_from(["freshet", "categories", "--days", "7"]);
        apply_overrides(&cli, &mut config);
        assert_eq!(config.eonet.days, 7);
    }

    #[test]
    fn test_activity_then_reset() {
        let transport = Arc::new(StubTransport::default());
        transport.respond(
            "https://api.github.test/repos/org/repo/events",
            200,
            &[("Last-Modified", "\"Tue\"")],
            r#"[{"id": "1", "type": "PushEvent", "actor": {"login": "someone"}, "repo": {"name": "org/repo"}}]"#,
        );
        let mut config = Config::default();
        config.github.api_base = "https://api.github.test".into();
        config.github.repo = Some("org/repo".into());
        let ctx = context(transport, config);

        tokio_test::block_on(show_activity(&ctx)).unwrap();
        assert_eq!(ctx.store.list_markers().unwrap().len(), 1);
        assert!(ctx.store.load_snapshot(ACTIVITY_SNAPSHOT).unwrap().is_some());

        reset(&ctx).unwrap();
        assert!(ctx.store.list_markers().unwrap().is_empty());
        assert!(ctx.store.load_snapshot(ACTIVITY_SNAPSHOT).unwrap().is_none());
        assert!(ctx.cache.is_empty());
    }

    #[test]
    fn test_watch_rejects_bad_interval() {
        let ctx = context(Arc::new(StubTransport::default()), Config::default());
        let result = tokio_test::block_on(watch(&ctx, "soon", false));
        assert!(matches!(result, Err(FreshetError::Other(_))));
    }
}
