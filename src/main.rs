// Allow common clippy pedantic lints
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! Conduit CDK CLI
//!
//! Command-line interface for Livy sessions and REST sources

use clap::Parser;
use conduit_cdk::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
