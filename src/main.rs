use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookwrapped::logging::init().context("init logging")?;

    let cli = bookwrapped::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        bookwrapped::cli::Command::Scrape(args) => {
            bookwrapped::scrape::run(args).await.context("scrape")?;
        }
        bookwrapped::cli::Command::Stats(args) => {
            bookwrapped::stats::run(args).context("stats")?;
        }
    }

    Ok(())
}
