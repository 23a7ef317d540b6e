use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use bookwrapped::app::gate::ScrapeGate;
use bookwrapped::app::{AppState, router};
use bookwrapped::cli::ScrapeOptions;
use bookwrapped::scrape::ScrapeConfig;

const FALLBACK_USER_ID: &str = "59826157";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,

    /// Static web assets directory (served under `/static` if it exists).
    #[arg(long, default_value = "static")]
    static_dir: PathBuf,

    #[arg(long, default_value_t = 1)]
    max_concurrency: usize,

    #[command(flatten)]
    scrape: ScrapeOptions,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookwrapped::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting bookwrapped-app");

    let default_user_id = std::env::var("BOOKWRAPPED_DEFAULT_USER_ID")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| FALLBACK_USER_ID.to_string());
    bookwrapped::store::validate_user_id(&default_user_id)
        .context("BOOKWRAPPED_DEFAULT_USER_ID")?;

    let config = ScrapeConfig::from_options(&args.scrape);
    tracing::info!(year = config.year, default_user_id = %default_user_id, "scrape settings");

    let state = AppState {
        config,
        default_user_id,
        gate: ScrapeGate::new(args.max_concurrency),
    };
    let app = router(state, Some(args.static_dir.as_path()));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(?err, "install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
