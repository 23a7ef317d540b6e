use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use url::Url;

const USER_AGENT: &str = concat!("bookwrapped/", env!("CARGO_PKG_VERSION"));

pub fn build_client() -> anyhow::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()
        .context("build scrape http client")
}

/// GET a page and return its body. Non-2xx statuses are errors.
pub async fn fetch_html(client: &reqwest::Client, url: &Url) -> anyhow::Result<String> {
    tracing::debug!(%url, "GET");
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("GET {url}: HTTP {status}");
    }

    response
        .text()
        .await
        .with_context(|| format!("read body: {url}"))
}

/// Joins `path` (which may carry a query) onto the site root.
pub fn site_url(base_url: &str, path: &str) -> anyhow::Result<Url> {
    let base = Url::parse(base_url).with_context(|| format!("parse base url: {base_url}"))?;
    if base.scheme() != "http" && base.scheme() != "https" {
        anyhow::bail!("base url must be http/https: {base}");
    }
    base.join(path)
        .with_context(|| format!("join {path} onto {base}"))
}
