use serde::{Deserialize, Serialize};

/// One row of a user's reading list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub title: String,
    pub author: String,
    pub avg_rating: String,
    pub my_rating: Option<u8>,
    pub date_finished: String,
    pub cover: String,
    /// Book path slug after `/book/show/`, e.g. `123.Some_Title`.
    pub num_title: String,
}

impl ShelfEntry {
    pub const CSV_HEADER: [&'static str; 7] = [
        "title",
        "author",
        "avg_rating",
        "my_rating",
        "date_finished",
        "cover",
        "num_title",
    ];

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.author.clone(),
            self.avg_rating.clone(),
            self.my_rating.map(|r| r.to_string()).unwrap_or_default(),
            self.date_finished.clone(),
            self.cover.clone(),
            self.num_title.clone(),
        ]
    }

    pub fn from_row(row: &[String]) -> anyhow::Result<Self> {
        if row.len() != Self::CSV_HEADER.len() {
            anyhow::bail!(
                "shelf row must have {} fields, got {}",
                Self::CSV_HEADER.len(),
                row.len()
            );
        }
        Ok(Self {
            title: row[0].clone(),
            author: row[1].clone(),
            avg_rating: row[2].clone(),
            my_rating: row[3].trim().parse().ok(),
            date_finished: row[4].clone(),
            cover: row[5].clone(),
            num_title: row[6].clone(),
        })
    }
}

/// Metadata of one scraped book, persisted as `<slug>_book-metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub book_id_title: String,
    pub book_id: String,
    pub book_title: String,
    #[serde(default)]
    pub author: String,
    pub num_pages: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub cover: String,
    pub my_rating: Option<u8>,
    #[serde(default)]
    pub date_finished: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_first_published: Option<String>,
}

impl BookRecord {
    pub const CSV_HEADER: [&'static str; 11] = [
        "book_id_title",
        "book_id",
        "book_title",
        "author",
        "num_pages",
        "genres",
        "cover",
        "my_rating",
        "date_finished",
        "series",
        "year_first_published",
    ];

    pub fn to_row(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec![
            self.book_id_title.clone(),
            self.book_id.clone(),
            self.book_title.clone(),
            self.author.clone(),
            self.num_pages.map(|n| n.to_string()).unwrap_or_default(),
            serde_json::to_string(&self.genres)?,
            self.cover.clone(),
            self.my_rating.map(|r| r.to_string()).unwrap_or_default(),
            self.date_finished.clone(),
            self.series.clone().unwrap_or_default(),
            self.year_first_published.clone().unwrap_or_default(),
        ])
    }
}
