use crate::html::escape;
use crate::stats::Wrapped;

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
  </head>
  <body>
{body}
  </body>
</html>
"#,
        title = escape(title),
    )
}

pub fn index_page(default_user_id: &str) -> String {
    let body = format!(
        r#"    <main class="index">
      <h1>Your year in books</h1>
      <p>Enter your Goodreads user id (the number in your profile URL).</p>
      <form action="/wrapped" method="post">
        <input type="text" name="goodreads_user_id" placeholder="{placeholder}" autofocus>
        <button type="submit">Wrap it up</button>
      </form>
      <p class="hint">Scraping can take a few minutes the first time.</p>
    </main>"#,
        placeholder = escape(default_user_id),
    );
    layout("Books Wrapped", &body)
}

fn list_items(items: &[String]) -> String {
    if items.is_empty() {
        return "        <li class=\"empty\">nothing yet</li>\n".to_owned();
    }
    items
        .iter()
        .map(|item| format!("        <li>{}</li>\n", escape(item)))
        .collect()
}

pub fn wrapped_page(wrapped: &Wrapped, year: i32) -> String {
    let covers = wrapped
        .covers
        .iter()
        .map(|src| format!("        <img src=\"{}\" alt=\"\" loading=\"lazy\">\n", escape(src)))
        .collect::<String>();

    let body = format!(
        r#"    <main class="wrapped">
      <h1>{year} Wrapped</h1>
      <p class="user">Goodreads user {user_id}</p>
      <section class="totals">
        <div><span class="number">{books_read}</span> books read</div>
        <div><span class="number">{pages_read}</span> pages turned</div>
      </section>
      <section>
        <h2>Top books</h2>
        <ol class="top-books">
{top_books}        </ol>
      </section>
      <section>
        <h2>Top genres</h2>
        <ol class="top-genres">
{top_genres}        </ol>
      </section>
      <section class="covers">
{covers}      </section>
      <p><a href="/">Try another user</a></p>
    </main>"#,
        user_id = escape(&wrapped.user_id),
        books_read = wrapped.books_read,
        pages_read = escape(&wrapped.pages_read),
        top_books = list_items(&wrapped.top_books),
        top_genres = list_items(&wrapped.top_genres),
    );
    layout(&format!("{year} Wrapped"), &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"    <main class="error">
      <h1>Something went wrong</h1>
      <p>{message}</p>
      <p><a href="/">Back</a></p>
    </main>"#,
        message = escape(message),
    );
    layout("Books Wrapped", &body)
}
