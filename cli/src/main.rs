/*!

This is the command line interface for planning and previewing the EKS environment described by a
stack file.

!*/

mod plan;
mod preview;
mod stack;

use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

/// Plan and preview EKS environments from Pulumi-style stack files.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "warn")]
    log_level: LevelFilter,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Print every resource of the environment in creation order.
    Plan(plan::Plan),
    /// Apply the environment against an in-memory engine and print the resulting outputs.
    Preview(preview::Preview),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Plan(plan) => plan.run(),
        Command::Preview(preview) => preview.run().await,
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use the given level for our crates only.
            Builder::new()
                .filter_level(LevelFilter::Error)
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("eksplan_blueprint"), level)
                .filter(Some("eksplan_config"), level)
                .filter(Some("eksplan_model"), level)
                .init();
        }
    }
}
