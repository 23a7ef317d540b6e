use std::cmp::Reverse;
use std::collections::HashMap;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::StatsArgs;
use crate::formats::BookRecord;
use crate::store::UserStore;

pub const TOP_N: usize = 5;

/// Genres too generic to say anything about a reading year.
pub const IGNORED_GENRES: [&str; 6] = [
    "Audiobook",
    "Adult",
    "Contemporary",
    "Adult Fiction",
    "Book Club",
    "Literary Fiction",
];

/// Everything the "wrapped" page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wrapped {
    pub user_id: String,
    pub top_books: Vec<String>,
    pub top_genres: Vec<String>,
    pub books_read: usize,
    pub pages_read: String,
    pub covers: Vec<String>,
}

impl Wrapped {
    pub fn compute(user_id: &str, books: &[BookRecord]) -> Self {
        let ordered = sort_for_display(books);
        Self {
            user_id: user_id.to_owned(),
            top_books: top_books(&ordered, TOP_N, true),
            top_genres: top_genres(&ordered, TOP_N),
            books_read: books_read(&ordered),
            pages_read: pages_read(&ordered),
            covers: ordered
                .iter()
                .map(|book| book.cover.clone())
                .filter(|cover| !cover.is_empty())
                .collect(),
        }
    }
}

pub fn run(args: StatsArgs) -> anyhow::Result<()> {
    let store = UserStore::existing(&args.data_dir, &args.user_id)?;
    let books = store.load_books()?;
    let wrapped = Wrapped::compute(&args.user_id, &books);
    let json = serde_json::to_string_pretty(&wrapped).context("serialize stats")?;
    println!("{json}");
    Ok(())
}

/// Highest rating first (unrated last), then title ascending.
pub fn sort_for_display(books: &[BookRecord]) -> Vec<BookRecord> {
    let mut ordered = books.to_vec();
    ordered.sort_by(|a, b| {
        Reverse(a.my_rating)
            .cmp(&Reverse(b.my_rating))
            .then_with(|| a.book_title.cmp(&b.book_title))
    });
    ordered
}

/// First `n` titles by rating, keeping the incoming order among ties.
/// With `strip`, subtitles after the first `:` are dropped.
pub fn top_books(books: &[BookRecord], n: usize, strip: bool) -> Vec<String> {
    let mut ranked = books.iter().collect::<Vec<_>>();
    ranked.sort_by_key(|book| Reverse(book.my_rating));
    ranked
        .into_iter()
        .take(n)
        .map(|book| {
            if strip {
                book.book_title
                    .split(':')
                    .next()
                    .unwrap_or_default()
                    .to_owned()
            } else {
                book.book_title.clone()
            }
        })
        .collect()
}

/// Most frequent genres as `"<genre>: <count>"`, ties in first-seen order.
pub fn top_genres(books: &[BookRecord], n: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for genre in books.iter().flat_map(|book| book.genres.iter()) {
        let genre = genre.as_str();
        if IGNORED_GENRES.contains(&genre) {
            continue;
        }
        match index.get(genre) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(genre, counts.len());
                counts.push((genre, 1));
            }
        }
    }

    counts.sort_by_key(|(_, count)| Reverse(*count));
    counts
        .into_iter()
        .take(n)
        .map(|(genre, count)| format!("{genre}: {count}"))
        .collect()
}

pub fn books_read(books: &[BookRecord]) -> usize {
    books.len()
}

pub fn pages_read(books: &[BookRecord]) -> String {
    let total = books
        .iter()
        .filter_map(|book| book.num_pages)
        .map(u64::from)
        .sum::<u64>();
    format_thousands(total)
}

fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
