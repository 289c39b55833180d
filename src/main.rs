use anyhow::{Context, Result};
use clap::Parser;

use git_release::config;
use git_release::git::repository::Git2Repository;
use git_release::steps::{DockerCli, GitHubHost};
use git_release::ui;
use git_release::{Coordinator, RunOptions};

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    about = "Version, tag and publish releases from conventional commits"
)]
struct Args {
    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, help = "Release this branch instead of the checked-out one")]
    branch: Option<String>,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[arg(long, help = "Show configured release branches and exit")]
    list: bool,

    #[arg(short = 'C', long, help = "Run as if started in this directory")]
    cwd: Option<String>,

    #[arg(short, long, help = "Print version information")]
    version: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            ui::display_error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

/// Returns whether the run ended released or skipped
fn run(args: Args) -> Result<bool> {
    if args.version {
        println!("git-release {}", env!("CARGO_PKG_VERSION"));
        return Ok(true);
    }

    if let Some(dir) = &args.cwd {
        std::env::set_current_dir(dir)
            .with_context(|| format!("cannot change directory to '{}'", dir))?;
    }

    let compiled = config::load_config(args.config.as_deref())
        .and_then(|c| c.compile())
        .context("invalid configuration")?;

    if args.list {
        ui::display_available_branches(compiled.resolver.rules());
        return Ok(true);
    }

    let repo = Git2Repository::open(".").context("not inside a git repository")?;
    let timeout = compiled.behavior.timeout();
    let registry = DockerCli::new(timeout);
    let host = GitHubHost::from_env(timeout)?;

    let mut coordinator = Coordinator::new(&compiled, &repo, &registry, &host);
    let options = RunOptions {
        branch: args.branch,
        dry_run: args.dry_run,
        date: None,
    };
    let report = match coordinator.run(&options) {
        Ok(report) => report,
        Err(e) if e.is_pre_flight() => {
            return Err(anyhow::Error::new(e).context("release aborted, nothing was changed"))
        }
        Err(e) => return Err(e.into()),
    };

    ui::display_run_report(&report);
    Ok(report.is_success())
}
