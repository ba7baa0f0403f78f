// src/scraper/scraper.rs
//
// Run orchestration: one browser, one listing tab for discovery, then a
// bounded fan-out over detail pages, then assembly.

use chrono::Local;
use ::scraper::Html;
use url::Url;

use crate::browser::BrowserSession;

use super::contact::{extract_contact_info, extract_page_metadata, ContactRules};
use super::discovery::discover;
use super::enrich::{enrich_all, MAX_CONCURRENT};
use super::models::ScrapeResult;
use super::ScraperError;

const INITIAL_SETTLE_MS: u64 = 3000;
const CONTENT_SETTLE_MS: u64 = 2000;

pub(crate) fn ts() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Scrape one rental listing page end to end.
pub fn scrape_rentals(url: &str) -> Result<ScrapeResult, ScraperError> {
    let base_origin = parse_origin(url)?;

    let session = BrowserSession::launch()?;
    let page = session.open_page()?;

    eprintln!("[{}] 📄 Navigating to {}", ts(), url);
    page.navigate(url)?;
    page.wait(INITIAL_SETTLE_MS);

    eprintln!("[{}] Starting incremental property collection...", ts());
    eprintln!("[{}] Waiting for initial content to load...", ts());
    page.wait(CONTENT_SETTLE_MS);

    let mut store = discover(&page, &base_origin)?;

    // Contact info and metadata come from the final rendered listing page,
    // after discovery has finished mutating its scroll state.
    let html = page.content()?;
    page.close();
    let doc = Html::parse_document(&html);
    let rules = ContactRules::new()?;
    let contact_info = extract_contact_info(&rules, &doc);
    let (title, description) = extract_page_metadata(&rules, &doc);

    let eligible = store.records().iter().filter(|r| r.qualifies()).count();
    if eligible > 0 {
        eprintln!(
            "[{}] Found {} properties. Starting parallel detail scraping...",
            ts(),
            eligible
        );
        enrich_all(&session, &mut store, &base_origin, MAX_CONCURRENT)?;
    }

    Ok(ScrapeResult::assemble(
        url,
        title,
        description,
        contact_info,
        store,
    ))
}

fn parse_origin(url: &str) -> Result<String, ScraperError> {
    let parsed = Url::parse(url)
        .map_err(|e| ScraperError::InvalidUrl(format!("cannot parse {url}: {e}")))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(ScraperError::InvalidUrl(format!(
            "{url} has no usable origin"
        )));
    }
    Ok(origin.ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path_and_query() {
        assert_eq!(
            parse_origin("https://www.emeraldpm.com/home_rentals?x=1").unwrap(),
            "https://www.emeraldpm.com"
        );
        assert!(parse_origin("not a url").is_err());
        assert!(parse_origin("data:text/plain,hi").is_err());
    }
}
