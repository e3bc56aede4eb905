//! reshipe CLI: resolve recipes against resource attribute groups.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "reshipe",
    version,
    about = "Resolve declarative recipes against resource attribute groups"
)]
struct Cli {
    #[command(subcommand)]
    command: reshipe::cli::Commands,
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = reshipe::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
