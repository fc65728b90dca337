//! Skill tree CLI entry point.
//!
//! Binary name: `skilltree`
//!
//! Parses CLI arguments, loads configuration and both skill feeds, then
//! dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::{AppState, FeedPaths};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    skilltree_observe::tracing_setup::init_tracing(cli.log_filter(), cli.otel)
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "skilltree", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(FeedPaths {
        data_dir: cli.data_dir.clone(),
        primary: cli.primary.clone(),
        secondary: cli.secondary.clone(),
    })
    .await?;

    let result = match cli.command {
        Commands::Merge { out } => cli::merge::handle_merge(&state, out.as_deref(), cli.json, cli.quiet).await,
        Commands::Ranks => cli::ranks::handle_ranks(&state, cli.json),
        Commands::Layout { geometry, user } => {
            cli::layout::handle_layout(&state, geometry.as_deref(), user.as_deref(), cli.json).await
        }
        Commands::Progress { action } => cli::progress::handle_progress_command(action, &state, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    };

    skilltree_observe::tracing_setup::shutdown_tracing();
    result
}
