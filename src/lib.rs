#![forbid(unsafe_code)]

pub mod app;
pub mod book_page;
pub mod cli;
pub mod csv;
pub mod formats;
pub mod html;
pub mod http;
pub mod logging;
pub mod scrape;
pub mod shelf;
pub mod stats;
pub mod store;
