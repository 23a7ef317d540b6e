use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Scrape(ScrapeArgs),
    Stats(StatsArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// `all_books.json` only.
    Json,
    /// `all_books.json` and `all_books.csv`.
    #[default]
    Csv,
}

/// Options shared by the CLI `scrape` command and the web app.
#[derive(Debug, Clone, Args)]
pub struct ScrapeOptions {
    /// Directory holding one cache folder per user id.
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Site root to scrape (overridable for local fixtures).
    #[arg(long, default_value = "https://www.goodreads.com")]
    pub base_url: String,

    /// Year to review (default: current year).
    #[arg(long)]
    pub year: Option<i32>,

    /// Delay after each request (politeness).
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,

    /// Maximum reading list pages to follow.
    #[arg(long, default_value_t = 5)]
    pub max_list_pages: usize,

    /// Condensed output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Goodreads user id (the number in the profile URL).
    #[arg(long)]
    pub user_id: String,

    #[command(flatten)]
    pub options: ScrapeOptions,

    /// Reuse the cached `read_this_year.csv` instead of fetching the list.
    #[arg(long)]
    pub reuse_list: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Goodreads user id whose cache should be summarized.
    #[arg(long)]
    pub user_id: String,

    /// Directory holding one cache folder per user id.
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,
}
