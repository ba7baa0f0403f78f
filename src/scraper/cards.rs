// src/scraper/cards.rs
//
// Listing-card heuristics. The markup is unlabeled and varies between
// properties, so everything here is an ordered cascade: try the specific
// selector first, fall back to regex over the card's text.

use regex::Regex;
use ::scraper::{ElementRef, Selector};

use super::models::PropertyRecord;
use super::text::element_text;
use super::ScraperError;
use super::{re, sel};

const MAX_ANCESTOR_DEPTH: usize = 15;
const CARD_TAGS: [&str; 4] = ["div", "article", "section", "li"];
const CARD_CLASS_KEYWORDS: [&str; 7] =
    ["card", "property", "listing", "rental", "item", "result", "unit"];
const STREET_TOKENS: [&str; 7] = ["street", "st", "ave", "road", "drive", "lane", "way"];

pub struct CardRules {
    address_sel: Selector,
    price_sel: Selector,
    address_re: Regex,
    price_re: Regex,
    beds_re: Regex,
    baths_re: Regex,
}

impl CardRules {
    pub fn new() -> Result<Self, ScraperError> {
        Ok(CardRules {
            address_sel: sel(r#"h2, h3, h4, .address, [class*="address"], [class*="location"]"#)?,
            price_sel: sel(r#".price, [class*="price"], .rent, [class*="rent"], .cost, [class*="cost"]"#)?,
            address_re: re(
                r"(?i)(\d+\s+[\w\s]+(?:Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Way|Blvd|Boulevard|Ct|Court|Circle|Cir|Place|Pl|Apt|Apartment|Unit|#)[\s,]*[\w\s]*(?:,\s*)?[A-Z][a-z]+\s*,\s*[A-Z]{2}\s+\d{5})",
            )?,
            price_re: re(r"\$[\d,]+(?:\s*/\s*(?:month|mo|week|wk))?")?,
            beds_re: re(r"(?i)\d+\s*(?:bed|br|bedroom)")?,
            baths_re: re(r"(?i)\d+\s*(?:bath|bathroom)")?,
        })
    }

    /// Populate summary fields from the card enclosing `anchor`. Fields set
    /// by an earlier pass are never overwritten (first writer wins).
    pub fn harvest(&self, anchor: ElementRef, record: &mut PropertyRecord) {
        let card = find_card(anchor);
        let card_text = element_text(card);

        if record.address.is_none() {
            if let Some(el) = card.select(&self.address_sel).next() {
                let text = element_text(el);
                if !text.is_empty() && !text.starts_with("RENT") && !text.contains('$') {
                    record.address = Some(text);
                }
            }
            if record.address.is_none() {
                if let Some(caps) = self.address_re.captures(&card_text) {
                    record.address = Some(caps[1].trim().to_string());
                }
            }
        }

        if record.price.is_none() {
            if let Some(el) = card.select(&self.price_sel).next() {
                let text = element_text(el);
                if let Some(m) = self.price_re.find(&text) {
                    record.price = Some(m.as_str().trim().to_string());
                }
            }
            if record.price.is_none() {
                if let Some(m) = self.price_re.find(&card_text) {
                    record.price = Some(m.as_str().trim().to_string());
                }
            }
        }

        let card_html = card.inner_html();
        if record.beds.is_none() {
            if let Some(m) = self.beds_re.find(&card_html) {
                record.beds = Some(m.as_str().trim().to_string());
            }
        }
        if record.baths.is_none() {
            if let Some(m) = self.baths_re.find(&card_html) {
                record.baths = Some(m.as_str().trim().to_string());
            }
        }
    }
}

/// Nearest qualifying card container: walk up from the anchor looking for a
/// block-level element that carries a card-ish class, shows a price, or
/// mentions a street suffix. Falls back to the anchor's immediate parent,
/// then the anchor itself.
fn find_card(anchor: ElementRef) -> ElementRef {
    let mut current = anchor;
    for _ in 0..MAX_ANCESTOR_DEPTH {
        let Some(parent) = current.parent().and_then(ElementRef::wrap) else {
            break;
        };
        if is_card_container(parent) {
            return parent;
        }
        current = parent;
    }
    anchor.parent().and_then(ElementRef::wrap).unwrap_or(anchor)
}

fn is_card_container(el: ElementRef) -> bool {
    if !CARD_TAGS.contains(&el.value().name()) {
        return false;
    }
    let classes = el.value().attr("class").unwrap_or("").to_lowercase();
    if CARD_CLASS_KEYWORDS.iter().any(|k| classes.contains(k)) {
        return true;
    }
    // Only the leading slice of text matters; cards are short.
    let head: String = element_text(el).chars().take(100).collect();
    if head.contains('$') {
        return true;
    }
    let lower = head.to_lowercase();
    STREET_TOKENS.iter().any(|t| lower.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::scraper::Html;

    fn first_anchor(doc: &Html) -> ElementRef<'_> {
        let a = Selector::parse("a").unwrap();
        doc.select(&a).next().expect("fixture has an anchor")
    }

    #[test]
    fn extracts_price_beds_baths_and_address_deterministically() {
        let doc = Html::parse_document(
            r#"<div class="results">
                 <div class="property-card">
                   <h3>742 Evergreen Terrace, Springfield, OR 97477</h3>
                   <span class="price">$1,450/month</span>
                   <span>2 bed, 1 bath</span>
                   <a href="/listings/rental_applications/new?listable_uid=x">View</a>
                 </div>
               </div>"#,
        );
        let rules = CardRules::new().unwrap();
        let mut record = PropertyRecord::new("x");
        rules.harvest(first_anchor(&doc), &mut record);

        assert_eq!(
            record.address.as_deref(),
            Some("742 Evergreen Terrace, Springfield, OR 97477")
        );
        assert_eq!(record.price.as_deref(), Some("$1,450/month"));
        assert_eq!(record.beds.as_deref(), Some("2 bed"));
        assert_eq!(record.baths.as_deref(), Some("1 bath"));
    }

    #[test]
    fn noisy_heading_falls_back_to_address_regex() {
        let doc = Html::parse_document(
            r#"<li class="unit">
                 <h3>RENT SPECIAL this week</h3>
                 <p>123 Main Street, Springfield, OR 97477</p>
                 <a href="?listable_uid=y">View</a>
               </li>"#,
        );
        let rules = CardRules::new().unwrap();
        let mut record = PropertyRecord::new("y");
        rules.harvest(first_anchor(&doc), &mut record);

        assert_eq!(
            record.address.as_deref(),
            Some("123 Main Street, Springfield, OR 97477")
        );
    }

    #[test]
    fn ancestor_walk_stops_at_first_qualifying_container() {
        let doc = Html::parse_document(
            r#"<li class="result-row">
                 <div><div><a href="?listable_uid=z">View</a></div></div>
               </li>"#,
        );
        let card = find_card(first_anchor(&doc));
        assert_eq!(card.value().name(), "li");
        assert_eq!(card.value().attr("class"), Some("result-row"));
    }

    #[test]
    fn falls_back_to_immediate_parent_when_nothing_qualifies() {
        let doc = Html::parse_document(r#"<span id="p"><a href="?listable_uid=q">More</a></span>"#);
        let card = find_card(first_anchor(&doc));
        assert_eq!(card.value().attr("id"), Some("p"));
    }

    #[test]
    fn populated_fields_are_never_overwritten() {
        let doc = Html::parse_document(
            r#"<div class="listing">
                 <span class="price">$2,000/month</span>
                 <a href="?listable_uid=w">View</a>
               </div>"#,
        );
        let rules = CardRules::new().unwrap();
        let mut record = PropertyRecord::new("w");
        record.price = Some("$1,000/month".to_string());
        rules.harvest(first_anchor(&doc), &mut record);
        assert_eq!(record.price.as_deref(), Some("$1,000/month"));
    }
}
