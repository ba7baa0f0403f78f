// src/scraper/contact.rs

use std::collections::HashSet;

use regex::Regex;
use ::scraper::{Html, Selector};

use super::models::ContactInfo;
use super::text::{document_text, element_text};
use super::ScraperError;
use super::{re, sel};

const MAX_ENTRIES: usize = 10;

pub struct ContactRules {
    phone_re: Regex,
    email_re: Regex,
    address_re: Regex,
    title_sel: Selector,
    meta_sel: Selector,
}

impl ContactRules {
    pub fn new() -> Result<Self, ScraperError> {
        Ok(ContactRules {
            phone_re: re(r"\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")?,
            email_re: re(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b")?,
            address_re: re(
                r"(?i)\d+\s+[\w\s]+(?:street|st|avenue|ave|road|rd|drive|dr|lane|ln|way|blvd|boulevard|ct|court|circle|cir|place|pl)[\s,]*[\w\s]*(?:,\s*)?[A-Z]{2}\s+\d{5}?",
            )?,
            title_sel: sel("title")?,
            meta_sel: sel(r#"meta[name="description"]"#)?,
        })
    }
}

/// Page-level contact details, pulled from the whole rendered page text
/// rather than any one property card.
pub fn extract_contact_info(rules: &ContactRules, doc: &Html) -> ContactInfo {
    let text = document_text(doc);
    ContactInfo {
        phone: capped_unique(rules.phone_re.find_iter(&text).map(|m| m.as_str())),
        email: capped_unique(rules.email_re.find_iter(&text).map(|m| m.as_str())),
        address: capped_unique(
            rules
                .address_re
                .find_iter(&text)
                .map(|m| m.as_str().trim()),
        ),
    }
}

/// `<title>` text and the description meta tag's content, either of which
/// may be absent.
pub fn extract_page_metadata(
    rules: &ContactRules,
    doc: &Html,
) -> (Option<String>, Option<String>) {
    let title = doc
        .select(&rules.title_sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());
    let description = doc
        .select(&rules.meta_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .filter(|t| !t.is_empty());
    (title, description)
}

/// First ten raw matches, then dedup preserving first-seen order. The cap
/// applies before dedup, mirroring the site behavior this was tuned on.
fn capped_unique<'a, I: Iterator<Item = &'a str>>(matches: I) -> Vec<String> {
    let mut seen = HashSet::new();
    matches
        .take(MAX_ENTRIES)
        .filter(|m| seen.insert(m.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_and_dedups_contact_entries() {
        let rules = ContactRules::new().unwrap();
        let html = r#"<html><body>
            <footer>Call (541) 555-0100 or (541) 555-0100, or email office@emeraldpm.com</footer>
            <p>Visit us at 123 Main Street, Eugene, OR 97401</p>
        </body></html>"#;
        let doc = Html::parse_document(html);

        let info = extract_contact_info(&rules, &doc);
        assert_eq!(info.phone, vec!["(541) 555-0100"]);
        assert_eq!(info.email, vec!["office@emeraldpm.com"]);
        assert_eq!(info.address.len(), 1);
        assert!(info.address[0].starts_with("123 Main Street"));
    }

    #[test]
    fn cap_applies_before_dedup() {
        // Twelve matches, but the first ten collapse to one unique value,
        // so the two fresh values past the cap are never seen.
        let repeats = "dup@ex.com ".repeat(10);
        let text = format!("{repeats} new1@ex.com new2@ex.com");
        let rules = ContactRules::new().unwrap();
        let unique = capped_unique(rules.email_re.find_iter(&text).map(|m| m.as_str()));
        assert_eq!(unique, vec!["dup@ex.com"]);
    }

    #[test]
    fn reads_title_and_meta_description() {
        let rules = ContactRules::new().unwrap();
        let doc = Html::parse_document(
            r#"<html><head><title>Emerald Rentals</title>
               <meta name="description" content="Homes for rent in Eugene"></head>
               <body></body></html>"#,
        );
        let (title, description) = extract_page_metadata(&rules, &doc);
        assert_eq!(title.as_deref(), Some("Emerald Rentals"));
        assert_eq!(description.as_deref(), Some("Homes for rent in Eugene"));
    }
}
