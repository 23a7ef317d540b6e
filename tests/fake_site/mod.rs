use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A local stand-in for the reading site, serving fixed list and book pages.
pub struct FakeSite {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl FakeSite {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start fake site");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let url = request.url().to_string();
                log.lock().expect("request log lock").push(url.clone());

                let (status, body) = route(&url);
                let mut response = tiny_http::Response::from_string(body).with_status_code(status);
                let header = tiny_http::Header::from_bytes(
                    &b"Content-Type"[..],
                    &b"text/html; charset=utf-8"[..],
                )
                .expect("build header");
                response = response.with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().expect("request log lock").clear();
    }

    pub fn book_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.starts_with("/book/show/"))
            .count()
    }
}

impl Drop for FakeSite {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn route(url: &str) -> (u16, String) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let page = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .unwrap_or("1");

    match (path, page) {
        ("/review/list/7", "1") => (200, list_page("7", &[DUNE_ROW, PIRANESI_ROW, OLD_ROW], Some(2))),
        ("/review/list/7", "2") => (200, list_page("7", &[HOBBIT_ROW], None)),
        ("/review/list/8", _) => (200, list_page("8", &[DUNE_ROW, BROKEN_ROW], None)),
        // An empty page that still links onward.
        ("/review/list/9", "1") => (200, list_page("9", &[DUNE_ROW], Some(2))),
        ("/review/list/9", "2") => (200, list_page("9", &[], Some(3))),
        ("/review/list/9", _) => (200, list_page("9", &[HOBBIT_ROW], None)),
        // A re-read: the same book finished twice in one year.
        ("/review/list/10", _) => (200, list_page("10", &[DUNE_ROW, PIRANESI_ROW, DUNE_ROW], None)),
        ("/book/show/44767458-dune", _) => (200, DUNE_PAGE.to_owned()),
        ("/book/show/50202953-piranesi", _) => (200, PIRANESI_PAGE.to_owned()),
        ("/book/show/5907.The_Hobbit", _) => (200, HOBBIT_PAGE.to_owned()),
        ("/book/show/999999-broken", _) => (500, "upstream exploded".to_owned()),
        _ => (404, "not found".to_owned()),
    }
}

fn list_page(user_id: &str, rows: &[&str], next: Option<u32>) -> String {
    let next_link = match next {
        Some(n) => format!(
            r#"<a class="next_page" rel="next" href="/review/list/{user_id}?page={n}&amp;per_page=40&amp;sort=date_read">next »</a>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<!doctype html>
<html><body>
<table id="books">
  <thead><tr><th>cover</th><th>title</th></tr></thead>
  <tbody>
{}
  </tbody>
</table>
{next_link}
</body></html>"#,
        rows.join("\n")
    )
}

const DUNE_ROW: &str = r#"<tr class="bookalike review">
  <td class="field cover"><label>cover</label><div class="value"><img src="https://img.example/dune_thumb.jpg"></div></td>
  <td class="field title"><label>title</label><div class="value"><a title="Dune (Dune, #1)" href="/book/show/44767458-dune">Dune</a></div></td>
  <td class="field author"><label>author</label><div class="value"><a href="/author/show/58">Herbert, Frank</a></div></td>
  <td class="field avg_rating"><label>avg rating</label><div class="value">4.27</div></td>
  <td class="field rating"><label>my rating</label><div class="value"><span class="staticStars notranslate" title="it was amazing"></span></div></td>
  <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Dec 20, 2022</span></div></td>
</tr>"#;

const PIRANESI_ROW: &str = r#"<tr class="bookalike review">
  <td class="field cover"><label>cover</label><div class="value"><img src="https://img.example/piranesi_thumb.jpg"></div></td>
  <td class="field title"><label>title</label><div class="value"><a title="Piranesi" href="/book/show/50202953-piranesi">Piranesi</a></div></td>
  <td class="field author"><label>author</label><div class="value"><a href="/author/show/1">Clarke, Susanna</a></div></td>
  <td class="field avg_rating"><label>avg rating</label><div class="value">4.23</div></td>
  <td class="field rating"><label>my rating</label><div class="value"><span class="staticStars notranslate" title="liked it"></span></div></td>
  <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Mar 02, 2022</span></div></td>
</tr>"#;

const OLD_ROW: &str = r#"<tr class="bookalike review">
  <td class="field title"><label>title</label><div class="value"><a title="Emma" href="/book/show/6969.Emma">Emma</a></div></td>
  <td class="field rating"><label>my rating</label><div class="value"><span class="staticStars notranslate" title="it was ok"></span></div></td>
  <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Jul 14, 2021</span></div></td>
</tr>"#;

const HOBBIT_ROW: &str = r#"<tr class="bookalike review">
  <td class="field title"><label>title</label><div class="value"><a title="The Hobbit" href="/book/show/5907.The_Hobbit">The Hobbit</a></div></td>
  <td class="field author"><label>author</label><div class="value"><a href="/author/show/656983">Tolkien, J.R.R.</a></div></td>
  <td class="field rating"><label>my rating</label><div class="value"><span class="staticStars notranslate" title="really liked it"></span></div></td>
  <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Jan 05, 2022</span></div></td>
</tr>"#;

const BROKEN_ROW: &str = r#"<tr class="bookalike review">
  <td class="field title"><label>title</label><div class="value"><a title="Broken" href="/book/show/999999-broken">Broken</a></div></td>
  <td class="field date_read"><label>date read</label><div class="value"><span class="date_read_value">Feb 01, 2022</span></div></td>
</tr>"#;

const DUNE_PAGE: &str = r#"<!doctype html>
<html><body>
  <img id="coverImage" src="https://img.example/dune.jpg">
  <h1 id="bookTitle">Dune</h1>
  <span itemprop="numberOfPages">896 pages</span>
  <div class="left"><a class="actionLinkLite bookPageGenreLink" href="/genres/science-fiction">Science Fiction</a></div>
  <div class="left"><a class="actionLinkLite bookPageGenreLink" href="/genres/fiction">Fiction</a> &gt; <a class="actionLinkLite bookPageGenreLink" href="/genres/classics">Classics</a></div>
  <div class="left"><a class="actionLinkLite bookPageGenreLink" href="/genres/audiobook">Audiobook</a></div>
</body></html>"#;

const PIRANESI_PAGE: &str = r#"<!doctype html>
<html><body>
  <img class="ResponsiveImage" src="https://img.example/piranesi.jpg">
  <h1 data-testid="bookTitle">Piranesi</h1>
  <p data-testid="pagesFormat">272 pages, Hardcover</p>
  <span class="BookPageMetadataSection__genreButton"><a href="/genres/fantasy">Fantasy</a></span>
  <span class="BookPageMetadataSection__genreButton"><a href="/genres/mystery">Mystery</a></span>
</body></html>"#;

const HOBBIT_PAGE: &str = r#"<!doctype html>
<html><body>
  <img id="coverImage" src="https://img.example/hobbit.jpg">
  <h1 id="bookTitle">The Hobbit: There and Back Again</h1>
  <span itemprop="numberOfPages">310 pages</span>
  <div class="left"><a class="actionLinkLite bookPageGenreLink" href="/genres/fantasy">Fantasy</a></div>
  <div class="left"><a class="actionLinkLite bookPageGenreLink" href="/genres/fiction">Fiction</a> &gt; <a class="actionLinkLite bookPageGenreLink" href="/genres/classics">Classics</a></div>
</body></html>"#;
