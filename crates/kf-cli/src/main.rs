//! kpiflow CLI - training KPI pipeline and read endpoint

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{ingest, run, serve, transform};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = dispatch(&cli).await {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(ec) => ec.0,
            None => {
                eprintln!("Error: {:#}", err);
                1
            }
        };
        std::process::exit(code);
    }
}

async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Ingest => ingest::execute(&cli.global).await,
        Commands::Transform(args) => transform::execute(args, &cli.global).await,
        Commands::Run(args) => run::execute(args, &cli.global).await,
        Commands::Serve(args) => serve::execute(args, &cli.global).await,
    }
}

/// `info` by default, `debug` with `--verbose`; `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}
