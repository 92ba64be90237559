use crate::output::{print_json, print_report, stale_symlink_warning};
use crate::root::{resolve_deploy_path, shell_pwd};
use crate::Cli;
use anyhow::Context;
use relaunch_core::config::Config;
use relaunch_core::control::LocalHost;
use relaunch_core::orchestrator::{Action, Orchestrator, RunFlags, RunOptions};
use relaunch_core::supervisor::SupervisorCtl;

/// One full start or restart run against the local supervisor.
pub fn run(action: Action, cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    let deploy_path = resolve_deploy_path(cli.deploy_path.as_deref())?;

    let mut supervisor =
        SupervisorCtl::from_config(&config.supervisor).context("cannot reach the supervisor")?;
    let mut host = LocalHost;

    let opts = RunOptions {
        requested: action,
        flags: RunFlags {
            less_graceful: cli.less_graceful,
            skip_push: cli.skip_tornado,
            skip_checks: cli.skip_checks,
            fill_cache: cli.fill_cache,
        },
        deploy_path,
        shell_pwd: shell_pwd(),
    };

    let report = Orchestrator::new(&config, &mut supervisor, &mut host)
        .run(&opts)
        .with_context(|| format!("{action} aborted"))?;

    let stale = match (&report.stale_symlink, &opts.shell_pwd) {
        (Some(link), Some(pwd)) => Some(stale_symlink_warning(link, pwd)),
        _ => None,
    };

    if cli.json {
        print_json(&report)?;
        // stdout carries the report only
        if let Some(warning) = stale {
            eprintln!("\n{warning}");
        }
        return Ok(());
    }

    print_report(&report);
    if let Some(warning) = stale {
        println!("\n{warning}");
    }
    Ok(())
}
