mod mode;
mod output;
mod root;
mod run;

use clap::Parser;
use relaunch_core::config::DEFAULT_CONFIG_PATH;
use relaunch_core::orchestrator::Action;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relaunch",
    about = "Start or restart a supervisor-managed server deployment with minimal downtime",
    long_about = "Start or restart a supervisor-managed server deployment with minimal downtime.\n\n\
                  Installed as `start-server` and `restart-server`, the invocation name selects \
                  the action; as `relaunch`, pass it explicitly.",
    version
)]
struct Cli {
    /// start or restart (implied when invoked as start-server / restart-server)
    action: Option<Action>,

    /// Config file
    #[arg(long, env = "RELAUNCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Release directory being deployed (default: current directory)
    #[arg(long, env = "RELAUNCH_DEPLOY_PATH")]
    deploy_path: Option<PathBuf>,

    /// Skip the configured syntax and database checks
    #[arg(long)]
    skip_checks: bool,

    /// Run the configured cache fill command first
    #[arg(long)]
    fill_cache: bool,

    /// Stop all workers up front and start them in bulk at the end
    #[arg(long)]
    less_graceful: bool,

    /// Leave the push-service shards alone
    #[arg(long, alias = "skip-push")]
    skip_tornado: bool,

    /// Output the run report as JSON
    #[arg(long, short = 'j')]
    json: bool,
}

fn main() {
    let invoked_as = std::env::args_os().next().map(PathBuf::from);
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = mode::resolve_action(invoked_as.as_deref(), cli.action)
        .and_then(|action| run::run(action, &cli));

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
