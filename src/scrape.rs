use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use chrono::Datelike as _;

use crate::cli::{OutputFormat, ScrapeArgs, ScrapeOptions};
use crate::formats::{BookRecord, ShelfEntry};
use crate::store::UserStore;

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub year: i32,
    pub delay: Duration,
    pub max_list_pages: usize,
    pub format: OutputFormat,
    pub reuse_list: bool,
}

impl ScrapeConfig {
    pub fn from_options(options: &ScrapeOptions) -> Self {
        Self {
            base_url: options.base_url.clone(),
            data_dir: options.data_dir.clone(),
            year: options.year.unwrap_or_else(current_year),
            delay: Duration::from_millis(options.delay_ms),
            max_list_pages: options.max_list_pages,
            format: options.format,
            reuse_list: false,
        }
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

pub async fn run(args: ScrapeArgs) -> anyhow::Result<()> {
    let mut config = ScrapeConfig::from_options(&args.options);
    config.reuse_list = args.reuse_list;

    let books = scrape_user(&config, &args.user_id).await?;
    let store = UserStore::open(&config.data_dir, &args.user_id)?;
    println!(
        "scraped {} books for user {} into {}",
        books.len(),
        args.user_id,
        store.dir().display()
    );
    Ok(())
}

/// Runs the whole pipeline for one user and returns every cached book.
///
/// Books already present in the cache are not fetched again, and only books
/// on this year's list are returned. Any failed request aborts the run;
/// metadata written before the failure stays on disk.
pub async fn scrape_user(config: &ScrapeConfig, user_id: &str) -> anyhow::Result<Vec<BookRecord>> {
    let started = Instant::now();
    let store = UserStore::open(&config.data_dir, user_id).context("open user cache")?;
    let client = crate::http::build_client()?;

    let shelf = load_shelf(config, &client, &store, user_id).await?;
    let book_ids = crate::shelf::write_book_ids(&store.book_ids_path(), &shelf)?;
    let already_scraped = store.scraped_ids()?;

    let to_scrape = book_ids
        .iter()
        .filter(|id| !already_scraped.contains(id.as_str()))
        .collect::<Vec<_>>();
    let cached = book_ids.len() - to_scrape.len();
    tracing::info!(
        user_id,
        year = config.year,
        total = book_ids.len(),
        cached,
        "books to scrape: {}",
        to_scrape.len()
    );

    for (idx, slug) in to_scrape.iter().enumerate() {
        tracing::info!(
            "scraping {slug}: #{} out of {} books",
            idx + 1 + cached,
            book_ids.len()
        );
        let Some(entry) = shelf.iter().find(|entry| &entry.num_title == *slug) else {
            continue;
        };
        let record = scrape_book(config, &client, slug, entry).await?;
        store.write_book(&record)?;
    }

    let mut books = store.condense().context("condense cached books")?;
    books.retain(|book| book_ids.contains(&book.book_id_title));
    store
        .write_condensed(&books, config.format)
        .context("write condensed books")?;

    tracing::info!(
        user_id,
        books = books.len(),
        dir = %store.dir().display(),
        elapsed = ?started.elapsed(),
        "scrape finished"
    );
    Ok(books)
}

async fn load_shelf(
    config: &ScrapeConfig,
    client: &reqwest::Client,
    store: &UserStore,
    user_id: &str,
) -> anyhow::Result<Vec<ShelfEntry>> {
    let csv_path = store.shelf_csv_path();
    if config.reuse_list && csv_path.exists() {
        tracing::info!(path = %csv_path.display(), "reusing cached reading list");
        return crate::shelf::read_shelf_csv(&csv_path);
    }

    let entries = crate::shelf::fetch_shelf(
        client,
        &config.base_url,
        user_id,
        config.max_list_pages,
        config.delay,
    )
    .await
    .context("fetch reading list")?;
    let entries = crate::shelf::filter_year(entries, config.year);

    for entry in entries.iter().filter(|e| e.num_title.len() <= 5) {
        tracing::warn!(title = %entry.title, "no book link found; skipping");
    }

    crate::shelf::write_shelf_csv(&csv_path, &entries)?;
    Ok(entries)
}

async fn scrape_book(
    config: &ScrapeConfig,
    client: &reqwest::Client,
    slug: &str,
    entry: &ShelfEntry,
) -> anyhow::Result<BookRecord> {
    let url = crate::http::site_url(&config.base_url, &crate::book_page::book_path(slug))?;
    let html = crate::http::fetch_html(client, &url).await?;
    tokio::time::sleep(config.delay).await;

    let page = crate::book_page::parse_book_page(&html)
        .with_context(|| format!("parse book page: {url}"))?;
    tracing::debug!(slug, title = %page.title, pages = ?page.num_pages, "parsed book page");
    Ok(page.into_record(slug, entry))
}
