//! Entry-point for the `chatline` binary.
use chatline_cli::Cli;
use chatline_cli::run_main;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_main(Cli::parse()).await
}
