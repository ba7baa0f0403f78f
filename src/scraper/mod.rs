// src/scraper/mod.rs

mod cards;
mod contact;
mod details;
pub mod discovery;
pub mod enrich;
pub mod models;
mod scraper;
mod scraper_error;
mod text;

pub use self::scraper::scrape_rentals;
pub(crate) use self::scraper::ts;
pub use self::scraper_error::ScraperError;

/// Selector parse failures are programmer errors in practice, but the parse
/// API is fallible so the error is surfaced rather than unwrapped.
pub(crate) fn sel(css: &str) -> Result<::scraper::Selector, ScraperError> {
    ::scraper::Selector::parse(css)
        .map_err(|e| ScraperError::HtmlParse(format!("bad selector {css:?}: {e}")))
}

pub(crate) fn re(pattern: &str) -> Result<regex::Regex, ScraperError> {
    regex::Regex::new(pattern)
        .map_err(|e| ScraperError::HtmlParse(format!("bad pattern {pattern:?}: {e}")))
}
