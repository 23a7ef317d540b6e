use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use scraper::{ElementRef, Html};
use url::Url;

use crate::formats::ShelfEntry;
use crate::html::{element_text, first_attr, first_text, normalize_ws, selector};

pub const SHELF_CSV_SEPARATOR: char = '|';
const BOOK_SHOW_PREFIX: &str = "/book/show/";
const PER_PAGE: u32 = 40;

/// Checked in order; "liked it" is a suffix of "really liked it".
const RATING_PHRASES: [(&str, u8); 5] = [
    ("did not like it", 1),
    ("it was ok", 2),
    ("really liked it", 4),
    ("it was amazing", 5),
    ("liked it", 3),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShelfPage {
    pub entries: Vec<ShelfEntry>,
    pub next_page: Option<String>,
}

pub fn list_path(user_id: &str, page: usize) -> String {
    format!("/review/list/{user_id}?per_page={PER_PAGE}&sort=date_read&page={page}")
}

pub fn parse_shelf_page(html: &str) -> anyhow::Result<ShelfPage> {
    let doc = Html::parse_document(html);
    let row_sel = selector("table#books tr")?;
    let next_sel = selector("a.next_page")?;

    let mut entries = Vec::new();
    for row in doc.select(&row_sel) {
        if let Some(entry) = parse_row(row)? {
            entries.push(entry);
        }
    }

    let next_page = first_attr(doc.root_element(), &next_sel, "href");
    Ok(ShelfPage { entries, next_page })
}

fn parse_row(row: ElementRef<'_>) -> anyhow::Result<Option<ShelfEntry>> {
    let title_link_sel = selector("td.field.title a")?;
    let Some(title_link) = row.select(&title_link_sel).next() else {
        return Ok(None);
    };

    let title = title_link
        .value()
        .attr("title")
        .map(normalize_ws)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(title_link));
    let num_title = title_link
        .value()
        .attr("href")
        .map(slug_from_href)
        .unwrap_or_default();

    let author_sel = selector("td.field.author a")?;
    let author = first_text(row, &author_sel)
        .or(field_value(row, "author")?)
        .map(|a| clean_author(&a))
        .unwrap_or_default();

    let avg_rating = field_value(row, "avg_rating")?.unwrap_or_default();

    let stars_sel = selector("td.field.rating .staticStars")?;
    let stars_title = first_attr(row, &stars_sel, "title");
    let rating_text = field_value(row, "rating")?;
    let my_rating = stars_title
        .as_deref()
        .and_then(rating_from_text)
        .or_else(|| rating_text.as_deref().and_then(rating_from_text));

    let date_sel = selector("td.field.date_read span.date_read_value")?;
    let date_finished = match first_text(row, &date_sel) {
        Some(date) => date,
        None => field_value(row, "date_read")?.unwrap_or_default(),
    };

    let cover_sel = selector("td.field.cover img")?;
    let cover = first_attr(row, &cover_sel, "src").unwrap_or_default();

    Ok(Some(ShelfEntry {
        title,
        author,
        avg_rating,
        my_rating,
        date_finished,
        cover,
        num_title,
    }))
}

/// Text of `td.field.<name>`: its `div.value` when present, otherwise the
/// cell text with the leading `label` removed.
fn field_value(row: ElementRef<'_>, name: &str) -> anyhow::Result<Option<String>> {
    let cell_sel = selector(&format!("td.field.{name}"))?;
    let Some(cell) = row.select(&cell_sel).next() else {
        return Ok(None);
    };

    let value_sel = selector("div.value")?;
    if let Some(value) = cell.select(&value_sel).next() {
        return Ok(Some(element_text(value)));
    }

    let label_sel = selector("label")?;
    let text = element_text(cell);
    let value = match first_text(cell, &label_sel) {
        Some(label) => text
            .strip_prefix(label.as_str())
            .map(str::trim)
            .unwrap_or(&text)
            .to_owned(),
        None => text,
    };
    Ok(Some(value))
}

fn slug_from_href(href: &str) -> String {
    match href.find(BOOK_SHOW_PREFIX) {
        Some(idx) => {
            let slug = &href[idx + BOOK_SHOW_PREFIX.len()..];
            slug.split(['?', '#']).next().unwrap_or_default().to_owned()
        }
        None => String::new(),
    }
}

/// "Rowling, J.K. *" -> "J.K. Rowling".
pub fn clean_author(raw: &str) -> String {
    let reordered = raw
        .split(',')
        .rev()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    normalize_ws(&reordered.replace('*', ""))
}

pub fn rating_from_text(text: &str) -> Option<u8> {
    let lower = text.to_ascii_lowercase();
    for (phrase, stars) in RATING_PHRASES {
        if lower.contains(phrase) {
            return Some(stars);
        }
    }
    lower
        .trim()
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
        .and_then(|d| u8::try_from(d).ok())
        .filter(|d| (1..=5).contains(d))
}

pub fn filter_year(entries: Vec<ShelfEntry>, year: i32) -> Vec<ShelfEntry> {
    let year = year.to_string();
    entries
        .into_iter()
        .filter(|entry| entry.date_finished.contains(&year))
        .collect()
}

/// Fetches the reading list, following `next_page` links up to `max_pages`.
pub async fn fetch_shelf(
    client: &reqwest::Client,
    base_url: &str,
    user_id: &str,
    max_pages: usize,
    delay: Duration,
) -> anyhow::Result<Vec<ShelfEntry>> {
    crate::store::validate_user_id(user_id)?;
    let mut entries = Vec::new();
    let mut url: Url = crate::http::site_url(base_url, &list_path(user_id, 1))?;

    for page_no in 1..=max_pages.max(1) {
        tracing::info!(%url, page = page_no, "fetching reading list");
        let html = crate::http::fetch_html(client, &url).await?;
        tokio::time::sleep(delay).await;

        let page = parse_shelf_page(&html)
            .with_context(|| format!("parse reading list page {page_no}"))?;
        if page.entries.is_empty() {
            break;
        }
        entries.extend(page.entries);

        let Some(next) = page.next_page else {
            break;
        };
        url = url
            .join(&next)
            .with_context(|| format!("resolve next page link: {next}"))?;
    }

    tracing::info!(rows = entries.len(), "reading list fetched");
    Ok(entries)
}

pub fn write_shelf_csv(path: &Path, entries: &[ShelfEntry]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("create shelf csv: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    crate::csv::write_row(&mut out, &ShelfEntry::CSV_HEADER, SHELF_CSV_SEPARATOR)
        .context("write shelf csv header")?;
    for entry in entries {
        crate::csv::write_row(&mut out, &entry.to_row(), SHELF_CSV_SEPARATOR)
            .context("write shelf csv row")?;
    }
    out.flush().context("flush shelf csv")?;
    Ok(())
}

pub fn read_shelf_csv(path: &Path) -> anyhow::Result<Vec<ShelfEntry>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read shelf csv: {}", path.display()))?;
    let mut rows = crate::csv::parse_rows(&text, SHELF_CSV_SEPARATOR).into_iter();

    let header = rows
        .next()
        .ok_or_else(|| anyhow::anyhow!("shelf csv is empty: {}", path.display()))?;
    if header != ShelfEntry::CSV_HEADER {
        anyhow::bail!("unexpected shelf csv header: {header:?}");
    }

    rows.enumerate()
        .map(|(idx, row)| {
            ShelfEntry::from_row(&row).with_context(|| format!("shelf csv row {}", idx + 2))
        })
        .collect()
}

/// Writes `my_books.txt`: one slug per line in list order, skipping rows
/// without a usable link. A book read twice is listed once.
pub fn write_book_ids(path: &Path, entries: &[ShelfEntry]) -> anyhow::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let ids = entries
        .iter()
        .map(|entry| entry.num_title.clone())
        .filter(|slug| slug.len() > 5)
        .filter(|slug| seen.insert(slug.clone()))
        .collect::<Vec<_>>();

    let mut out = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create book id list: {}", path.display()))?;
    for id in &ids {
        writeln!(out, "{id}").context("write book id")?;
    }
    out.flush().context("flush book id list")?;
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_HTML: &str = r#"<!doctype html>
<html><body>
<table id="books">
  <thead><tr><th>title</th><th>author</th></tr></thead>
  <tbody>
    <tr id="review_1" class="bookalike review">
      <td class="field cover"><label>cover</label><div class="value"><a href="/book/show/44767458-dune"><img src="https://img.example/dune._SY75_.jpg"></a></div></td>
      <td class="field title"><label>title</label><div class="value"><a title="Dune (Dune, #1)" href="/book/show/44767458-dune">
        Dune
        <span class="darkGreyText">(Dune, #1)</span></a></div></td>
      <td class="field author"><label>author</label><div class="value"><a href="/author/show/58.Frank_Herbert">Herbert, Frank</a> *</div></td>
      <td class="field avg_rating"><label>avg rating</label><div class="value">4.27</div></td>
      <td class="field rating"><label>my rating</label><div class="value"><div class="stars" data-rating="5"><span class="staticStars notranslate" title="it was amazing"></span></div></div></td>
      <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Dec 20, 2022</span></div></td>
    </tr>
    <tr id="review_2" class="bookalike review">
      <td class="field cover"><label>cover</label><div class="value"><img src=""></div></td>
      <td class="field title"><label>title</label><div class="value"><a title="Piranesi" href="/book/show/50202953-piranesi">Piranesi</a></div></td>
      <td class="field author"><label>author</label><div class="value"><a href="/author/show/1">Clarke, Susanna</a></div></td>
      <td class="field avg_rating"><label>avg rating</label><div class="value">4.23</div></td>
      <td class="field rating"><label>my rating</label><div class="value"><span class="staticStars notranslate" title="liked it"></span></div></td>
      <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Mar 02, 2021</span></div></td>
    </tr>
    <tr class="bookalike review">
      <td class="field title"><label>title</label><a title="No Link" href="/author/show/9">No Link</a></td>
      <td class="field date_read"><label>date read</label> not set</td>
    </tr>
  </tbody>
</table>
<a class="next_page" rel="next" href="/review/list/7?page=2&amp;per_page=40">next »</a>
</body></html>"#;

    #[test]
    fn parse_shelf_page_extracts_rows_and_next_link() {
        let page = parse_shelf_page(LIST_HTML).unwrap();
        assert_eq!(page.entries.len(), 3);
        assert_eq!(
            page.next_page.as_deref(),
            Some("/review/list/7?page=2&per_page=40")
        );

        let dune = &page.entries[0];
        assert_eq!(dune.title, "Dune (Dune, #1)");
        assert_eq!(dune.author, "Frank Herbert");
        assert_eq!(dune.avg_rating, "4.27");
        assert_eq!(dune.my_rating, Some(5));
        assert_eq!(dune.date_finished, "Dec 20, 2022");
        assert_eq!(dune.cover, "https://img.example/dune._SY75_.jpg");
        assert_eq!(dune.num_title, "44767458-dune");

        let piranesi = &page.entries[1];
        assert_eq!(piranesi.my_rating, Some(3));
        assert_eq!(piranesi.cover, "");

        let unlinked = &page.entries[2];
        assert_eq!(unlinked.num_title, "");
        assert_eq!(unlinked.date_finished, "not set");
        assert_eq!(unlinked.my_rating, None);
    }

    #[test]
    fn book_ids_skip_repeated_reads() {
        let temp = tempfile::TempDir::new().unwrap();
        let page = parse_shelf_page(LIST_HTML).unwrap();
        let mut entries = page.entries.clone();
        entries.push(page.entries[0].clone());
        entries.insert(1, page.entries[1].clone());

        let ids_path = temp.path().join("my_books.txt");
        let ids = write_book_ids(&ids_path, &entries).unwrap();
        assert_eq!(ids, vec!["44767458-dune", "50202953-piranesi"]);
        assert_eq!(
            std::fs::read_to_string(&ids_path).unwrap(),
            "44767458-dune\n50202953-piranesi\n"
        );
    }

    #[test]
    fn rating_phrases_prefer_the_longest_match() {
        assert_eq!(rating_from_text("my rating really liked it"), Some(4));
        assert_eq!(rating_from_text("my rating liked it"), Some(3));
        assert_eq!(rating_from_text("did not like it"), Some(1));
        assert_eq!(rating_from_text("It was OK"), Some(2));
        assert_eq!(rating_from_text("rated 4"), Some(4));
        assert_eq!(rating_from_text("my rating"), None);
        assert_eq!(rating_from_text("rated 0"), None);
    }

    #[test]
    fn clean_author_reorders_and_strips_markers() {
        assert_eq!(clean_author("Rowling, J.K. *"), "J.K. Rowling");
        assert_eq!(clean_author("Le Guin,  Ursula K."), "Ursula K. Le Guin");
        assert_eq!(clean_author("Homer"), "Homer");
    }

    #[test]
    fn filter_year_keeps_matching_dates_only() {
        let page = parse_shelf_page(LIST_HTML).unwrap();
        let kept = filter_year(page.entries, 2022);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "Dune (Dune, #1)");
    }

    #[test]
    fn shelf_csv_and_book_ids_round_trip_through_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let page = parse_shelf_page(LIST_HTML).unwrap();

        let csv_path = temp.path().join("read_this_year.csv");
        write_shelf_csv(&csv_path, &page.entries).unwrap();
        let header = std::fs::read_to_string(&csv_path).unwrap();
        assert!(header.starts_with("title|author|avg_rating|my_rating|date_finished|cover|num_title\n"));
        assert_eq!(read_shelf_csv(&csv_path).unwrap(), page.entries);

        let ids_path = temp.path().join("my_books.txt");
        let ids = write_book_ids(&ids_path, &page.entries).unwrap();
        assert_eq!(ids, vec!["44767458-dune", "50202953-piranesi"]);
        assert_eq!(
            std::fs::read_to_string(&ids_path).unwrap(),
            "44767458-dune\n50202953-piranesi\n"
        );
        assert_eq!(
            std::fs::read_to_string(&ids_path).unwrap(),
            "44767458-dune\n50202953-piranesi\n"
        );
    }
}
