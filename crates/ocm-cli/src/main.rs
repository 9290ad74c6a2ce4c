//! OCM CLI - configuration tooling over the OCM context kernel
//!
//! This is the main entry point for the `ocm` command-line interface.

mod cli;
mod commands;
mod context;
mod loader;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    let options = cli.load_options();

    // Run command
    match cli.command {
        Commands::Config(cmd) => commands::config::run(cmd, &options),
        Commands::Attributes(args) => commands::attributes::run(args, &options),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            // Kernel events are debug level; stay quiet unless asked
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
