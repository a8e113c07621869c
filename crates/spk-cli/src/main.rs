//! tailscale-synology - build Tailscale packages for Synology DSM

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use spk_cli::{Cli, run};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    for path in run(&cli)? {
        println!("{}", path.display());
    }
    Ok(())
}
