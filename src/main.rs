use std::collections::HashSet;
use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use clone_finder::config::{self, Config};
use clone_finder::cycle::{CycleController, CycleSettings};
use clone_finder::output::terminal;
use clone_finder::reddit::client::RedditClient;

/// Clone Finder: finds duplicated posts in a reddit moderation queue.
///
/// Polls the queue, reports posts that point at the same partner post as an
/// earlier one, optionally removes them, and keeps a roster of posts from
/// chosen partner subreddits.
#[derive(Parser)]
#[command(name = "clone-finder", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the queue until interrupted
    Run(CycleArgs),

    /// Run a single cycle and exit
    Once(CycleArgs),

    /// Show the state directory and the persisted roster
    Status,
}

#[derive(Args)]
struct CycleArgs {
    /// Track posts from partner subreddits in the roster file
    #[arg(short = 'c', long)]
    check: bool,

    /// Mark tracked posts removed by moderators (requires --check)
    #[arg(short = 'l', long)]
    modlog: bool,

    /// Remove queued items whose partner post is already removed (requires --check)
    #[arg(short = 'q', long)]
    modqueue: bool,

    /// Debug logging and extra notifications
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Seconds to wait between cycles (default: 30)
    #[arg(short = 'w', long, allow_hyphen_values = true)]
    wait: Option<String>,

    /// Remove clones automatically: all, flaired or unflaired
    #[arg(short = 'r', long, value_name = "KIND")]
    remove: Option<String>,

    /// Partner subreddits to track, separated by commas
    #[arg(long)]
    sources: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Run(a) | Commands::Once(a) if a.verbose);
    let default_filter = if verbose {
        "clone_finder=debug,notify=info,clones=info"
    } else {
        "clone_finder=info,notify=info,clones=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    info!("Running Clone Finder version {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => {
            let config = Config::load()?;
            let mut controller = build_controller(&config, &args)?;
            let client = RedditClient::new(&config)?;
            controller.run(&client).await?;
        }

        Commands::Once(args) => {
            let config = Config::load()?;
            let mut controller = build_controller(&config, &args)?;
            let client = RedditClient::new(&config)?;
            let report = controller.run_cycle(&client).await?;
            terminal::display_cycle_report(&report);
        }

        Commands::Status => {
            let config = Config::load()?;
            clone_finder::status::show(&config)?;
        }
    }

    Ok(())
}

/// Resolve CLI flags over env configuration and build the controller.
///
/// CLI values win; env values fill in what the CLI left out.
fn build_controller(config: &Config, args: &CycleArgs) -> Result<CycleController> {
    config.require_reddit()?;
    config.ensure_state_dir()?;

    let wait = config::parse_wait(args.wait.as_deref().or(config.wait.as_deref()));
    let removal = config::parse_removal(args.remove.as_deref().or(config.remove.as_deref()));

    if (args.modlog || args.modqueue) && !args.check {
        tracing::warn!("--modlog and --modqueue only take effect together with --check.");
    }

    let sources: HashSet<String> = if args.check {
        match args.sources.as_deref().or(config.sources.as_deref()) {
            Some(raw) => config::parse_sources(raw),
            None => config::prompt_sources()?,
        }
    } else {
        HashSet::new()
    };

    info!(
        wait_secs = wait,
        remove_flaired = removal.flaired,
        remove_unflaired = removal.unflaired,
        partner_sources = sources.len(),
        "Configuration resolved"
    );

    let settings = CycleSettings {
        check_partner_sources: args.check,
        check_mod_log: args.modlog,
        check_mod_queue: args.modqueue,
        verbose: args.verbose,
        poll_interval: Duration::from_secs(wait),
        removal,
        roster_path: config.roster_path(),
        show_progress: std::io::stderr().is_terminal(),
    };

    Ok(CycleController::new(settings, sources))
}
