//! vcsync CLI entry point
//!
//! Parses arguments, sets up logging and renders failures through
//! [`user_friendly_error`]. Any failure, including a repository that ended in
//! a recovered update, exits with status 1.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vcsync::cli;
use vcsync::core::user_friendly_error;

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.log_level());

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
