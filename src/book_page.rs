use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::formats::{BookRecord, ShelfEntry};
use crate::html::{element_text, first_attr, first_text, selector};

/// Fields read from a single `/book/show/<slug>` page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPage {
    pub title: String,
    pub num_pages: Option<u32>,
    pub genres: Vec<String>,
    pub cover: String,
    pub series: Option<String>,
    pub year_first_published: Option<String>,
}

impl BookPage {
    pub fn into_record(self, slug: &str, entry: &ShelfEntry) -> BookRecord {
        let book_title = if self.title.is_empty() {
            entry.title.clone()
        } else {
            self.title
        };
        let cover = if self.cover.is_empty() {
            entry.cover.clone()
        } else {
            self.cover
        };

        BookRecord {
            book_id_title: slug.to_owned(),
            book_id: book_id(slug),
            book_title,
            author: entry.author.clone(),
            num_pages: self.num_pages,
            genres: self.genres,
            cover,
            my_rating: entry.my_rating,
            date_finished: entry.date_finished.clone(),
            series: self.series,
            year_first_published: self.year_first_published,
        }
    }
}

static RE_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("series regex"));
static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{3,4}").expect("year regex"));

pub fn book_path(slug: &str) -> String {
    format!("/book/show/{slug}")
}

/// Leading run of the slug before the first `.` or `-`.
pub fn book_id(slug: &str) -> String {
    slug.split(['.', '-'])
        .find(|part| !part.is_empty())
        .unwrap_or_default()
        .to_owned()
}

pub fn parse_book_page(html: &str) -> anyhow::Result<BookPage> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let title_sel = selector("h1#bookTitle, h1[data-testid=\"bookTitle\"]")?;
    let title = first_text(root, &title_sel).unwrap_or_default();

    Ok(BookPage {
        title,
        num_pages: parse_num_pages(root)?,
        genres: parse_genres(root)?,
        cover: parse_cover(root)?,
        series: parse_series(root)?,
        year_first_published: parse_year_first_published(root)?,
    })
}

fn parse_num_pages(root: ElementRef<'_>) -> anyhow::Result<Option<u32>> {
    let pages_sel = selector("span[itemprop=\"numberOfPages\"], p[data-testid=\"pagesFormat\"]")?;
    Ok(first_text(root, &pages_sel).and_then(|text| leading_number(&text)))
}

fn leading_number(text: &str) -> Option<u32> {
    let token = text.split_whitespace().next()?;
    token.replace(',', "").parse().ok()
}

fn parse_genres(root: ElementRef<'_>) -> anyhow::Result<Vec<String>> {
    let block_sel = selector("div.left")?;
    let link_sel = selector("a.actionLinkLite.bookPageGenreLink")?;

    let mut genres = Vec::new();
    for block in root.select(&block_sel) {
        let path = block
            .select(&link_sel)
            .map(element_text)
            .collect::<Vec<_>>()
            .join(" > ");
        if !path.trim().is_empty() {
            genres.push(path);
        }
    }
    if !genres.is_empty() {
        return Ok(genres);
    }

    let button_sel = selector("span.BookPageMetadataSection__genreButton a")?;
    Ok(root
        .select(&button_sel)
        .map(element_text)
        .filter(|g| !g.is_empty())
        .collect())
}

fn parse_cover(root: ElementRef<'_>) -> anyhow::Result<String> {
    let cover_sel = selector("img#coverImage, img.ResponsiveImage")?;
    Ok(first_attr(root, &cover_sel, "src").unwrap_or_default())
}

fn parse_series(root: ElementRef<'_>) -> anyhow::Result<Option<String>> {
    let series_sel = selector("#bookSeries a")?;
    Ok(first_text(root, &series_sel).and_then(|text| {
        let name = RE_SERIES.captures(&text)?.get(1)?.as_str().trim();
        (!name.is_empty()).then(|| name.to_owned())
    }))
}

fn parse_year_first_published(root: ElementRef<'_>) -> anyhow::Result<Option<String>> {
    let year_sel = selector("nobr.greyText")?;
    Ok(first_text(root, &year_sel).and_then(|text| first_year(&text)))
}

/// First run of 3 or 4 digits, e.g. "(first published 1965)" -> "1965".
fn first_year(text: &str) -> Option<String> {
    RE_YEAR.find(text).map(|m| m.as_str().to_owned())
}
