//! booty CLI: declarative workstation provisioning.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "booty",
    version,
    about = "Declarative workstation provisioning with recipes and dependency-ordered installs"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = booty::cli::DEFAULT_CONFIG)]
    config: PathBuf,

    /// Directory for per-target output logs and the run event log
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    /// Install without asking for confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: booty::cli::Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = booty::cli::RunSettings {
        config: cli.config,
        log_dir: cli.log_dir,
        yes: cli.yes,
    };
    if let Err(e) = booty::cli::dispatch(cli.command, &settings) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
