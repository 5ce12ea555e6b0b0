//! portcfg CLI - Build-time capability negotiation for portable C++ libraries

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use portcfg::NegotiationError;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Exit code for a rejected environment or a conflicting definition.
const EXIT_NEGOTIATION: i32 = 2;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        if let Some(err) = e.downcast_ref::<NegotiationError>() {
            portcfg::util::diagnostic::emit(&err.to_diagnostic(), color);
            std::process::exit(EXIT_NEGOTIATION);
        }
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("portcfg=debug")
    } else {
        EnvFilter::new("portcfg=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Probe(args) => commands::probe::execute(args),
        Commands::Check(args) => commands::check::execute(args),
        Commands::Resolve(args) => commands::resolve::execute(args),
        Commands::Explain(args) => commands::explain::execute(args),
        Commands::Matrix(args) => commands::matrix::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
