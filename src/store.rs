use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context as _;
use regex::Regex;

use crate::cli::OutputFormat;
use crate::formats::BookRecord;

const METADATA_SUFFIX: &str = "_book-metadata.json";
const CONDENSED_STEM: &str = "all_books";

/// Per-user cache directory: `<data_dir>/<user_id>/`.
#[derive(Debug, Clone)]
pub struct UserStore {
    dir: PathBuf,
}

impl UserStore {
    pub fn open(data_dir: &Path, user_id: &str) -> anyhow::Result<Self> {
        validate_user_id(user_id)?;
        let dir = data_dir.join(user_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create user cache dir: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Opens an existing cache without creating it.
    pub fn existing(data_dir: &Path, user_id: &str) -> anyhow::Result<Self> {
        validate_user_id(user_id)?;
        let dir = data_dir.join(user_id);
        if !dir.is_dir() {
            anyhow::bail!("no cache for user {user_id}: {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn shelf_csv_path(&self) -> PathBuf {
        self.dir.join("read_this_year.csv")
    }

    pub fn book_ids_path(&self) -> PathBuf {
        self.dir.join("my_books.txt")
    }

    pub fn book_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}{METADATA_SUFFIX}"))
    }

    pub fn condensed_json_path(&self) -> PathBuf {
        self.dir.join(format!("{CONDENSED_STEM}.json"))
    }

    pub fn condensed_csv_path(&self) -> PathBuf {
        self.dir.join(format!("{CONDENSED_STEM}.csv"))
    }

    /// Slugs that already have a metadata file.
    pub fn scraped_ids(&self) -> anyhow::Result<BTreeSet<String>> {
        Ok(self
            .metadata_files()?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                name.strip_suffix(METADATA_SUFFIX).map(str::to_owned)
            })
            .collect())
    }

    pub fn write_book(&self, record: &BookRecord) -> anyhow::Result<PathBuf> {
        if !is_safe_slug(&record.book_id_title) {
            anyhow::bail!("refusing to store book with unsafe slug: {:?}", record.book_id_title);
        }
        let path = self.book_path(&record.book_id_title);
        write_json_atomic(&path, record)
            .with_context(|| format!("write book metadata: {}", path.display()))?;
        Ok(path)
    }

    /// Loads every cached metadata file, ordered by file name.
    pub fn condense(&self) -> anyhow::Result<Vec<BookRecord>> {
        self.metadata_files()?
            .into_iter()
            .map(|path| {
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("read book metadata: {}", path.display()))?;
                serde_json::from_slice(&bytes)
                    .with_context(|| format!("parse book metadata: {}", path.display()))
            })
            .collect()
    }

    pub fn write_condensed(&self, books: &[BookRecord], format: OutputFormat) -> anyhow::Result<()> {
        let json_path = self.condensed_json_path();
        write_json_atomic(&json_path, &books)
            .with_context(|| format!("write condensed json: {}", json_path.display()))?;

        if format == OutputFormat::Csv {
            let csv_path = self.condensed_csv_path();
            write_books_csv(&csv_path, books)
                .with_context(|| format!("write condensed csv: {}", csv_path.display()))?;
        }
        Ok(())
    }

    pub fn load_books(&self) -> anyhow::Result<Vec<BookRecord>> {
        let path = self.condensed_json_path();
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read condensed json: {}", path.display()))?;
        serde_json::from_slice(&bytes).context("parse condensed json")
    }

    fn metadata_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("read user cache dir: {}", self.dir.display()))?
        {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') || name.starts_with(CONDENSED_STEM) {
                continue;
            }
            if name.ends_with(METADATA_SUFFIX) && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Profile ids: digits, optionally followed by a `-name` suffix.
static RE_USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(?:-[A-Za-z0-9_-]+)?$").expect("user id regex"));

/// Accepts only ids that are safe both as a directory name and as a URL
/// path segment.
pub fn validate_user_id(user_id: &str) -> anyhow::Result<()> {
    if !RE_USER_ID.is_match(user_id) {
        anyhow::bail!("invalid user id: {user_id:?}");
    }
    Ok(())
}

fn is_safe_slug(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.chars().any(char::is_control)
}

fn write_books_csv(path: &Path, books: &[BookRecord]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    crate::csv::write_row(&mut out, &BookRecord::CSV_HEADER, ',')?;
    for book in books {
        crate::csv::write_row(&mut out, &book.to_row()?, ',')?;
    }
    out.flush()?;
    Ok(())
}

fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = parent.join(format!(".tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    std::fs::write(&tmp_path, &data)
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
