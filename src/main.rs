use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freshet::app::AppContext;
use freshet::cli::{commands, Cli, Commands};
use freshet::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    commands::apply_overrides(&cli, &mut config);

    let ctx = AppContext::new(config, cli.db.clone())?;

    match cli.command {
        Commands::Activity { .. } => {
            commands::show_activity(&ctx).await?;
        }
        Commands::Categories { .. } => {
            commands::show_categories(&ctx).await?;
        }
        Commands::Watch {
            interval,
            no_initial_refresh,
        } => {
            commands::watch(&ctx, &interval, no_initial_refresh).await?;
        }
        Commands::Markers => {
            commands::list_markers(&ctx)?;
        }
        Commands::Reset => {
            commands::reset(&ctx)?;
        }
    }

    Ok(())
}
