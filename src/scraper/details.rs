// src/scraper/details.rs
//
// Detail-page extraction: selector cascades first, labelled-text regexes for
// everything the markup doesn't structure.

use regex::Regex;
use ::scraper::{Html, Selector};

use super::models::DetailBundle;
use super::text::{document_text, element_text};
use super::ScraperError;
use super::{re, sel};

const DETAIL_SETTLE_MS: u64 = 2000;

const MAX_FEATURES: usize = 20;
const MAX_IMAGES: usize = 10;
const MAX_LABEL_VALUE_CHARS: usize = 200;

const DESCRIPTION_SELECTORS: [&str; 7] = [
    ".description",
    r#"[class*="description"]"#,
    ".property-description",
    ".details",
    r#"[class*="details"]"#,
    "p.description",
    ".content p",
];

const FEATURE_CONTAINERS: [&str; 4] = [
    ".features",
    r#"[class*="feature"]"#,
    ".property-features",
    "ul.features",
];

const AMENITY_CONTAINERS: [&str; 3] = [".amenities", r#"[class*="amenity"]"#, "ul.amenities"];

const IMAGE_SELECTOR: &str = r#"img[src*="property"], img[src*="rental"], img[src*="listing"], .property-image img, .gallery img"#;

pub struct DetailRules {
    description_sels: Vec<Selector>,
    feature_groups: Vec<Selector>,
    amenity_groups: Vec<Selector>,
    image_sel: Selector,
    sqft_re: Regex,
    availability_res: Vec<Regex>,
    pet_res: Vec<Regex>,
    deposit_re: Regex,
    lease_re: Regex,
    utilities_re: Regex,
    parking_re: Regex,
    laundry_re: Regex,
}

impl DetailRules {
    pub fn new() -> Result<Self, ScraperError> {
        let item_group = |container: &str| {
            sel(&format!(
                "{container} li, {container} .feature, {container} .amenity"
            ))
        };
        Ok(DetailRules {
            description_sels: DESCRIPTION_SELECTORS
                .iter()
                .map(|s| sel(s))
                .collect::<Result<_, _>>()?,
            feature_groups: FEATURE_CONTAINERS
                .iter()
                .map(|s| item_group(s))
                .collect::<Result<_, _>>()?,
            amenity_groups: AMENITY_CONTAINERS
                .iter()
                .map(|s| item_group(s))
                .collect::<Result<_, _>>()?,
            image_sel: sel(IMAGE_SELECTOR)?,
            sqft_re: re(r"(?i)(\d+)\s*(?:sq\.?\s*ft\.?|square\s*feet|sqft)")?,
            // Ordered: explicit date forms, then the label, then a catch-all.
            availability_res: vec![
                re(r"(?i)available\s*(?:now|immediately|on\s*[\d/]+)")?,
                re(r"(?i)availability[:\s]+([^\n]+)")?,
                re(r"(?i)available\s*([^\n]+)")?,
            ],
            // Labeled phrase first; bare species mentions are the fallback.
            pet_res: vec![
                re(r"(?i)pets?\s*(?:allowed|policy|friendly|restrictions?)[:\s]+([^\n]+)")?,
                re(r"(?i)(?:cats?|dogs?)\s*(?:allowed|welcome|not\s*allowed)")?,
            ],
            deposit_re: re(r"(?i)deposit[:\s]*\$?([\d,]+)")?,
            lease_re: re(r"(?i)lease[:\s]*(\d+\s*(?:month|year|mo|yr))")?,
            utilities_re: re(r"(?i)utilities?[:\s]+([^\n]+)")?,
            parking_re: re(r"(?i)parking[:\s]+([^\n]+)")?,
            laundry_re: re(r"(?i)laundry[:\s]+([^\n]+)")?,
        })
    }
}

/// Resolve a card link against the page it came from. Absolute links pass
/// through; root-relative links join the origin; anything else gets a single
/// slash between base and link.
pub fn resolve_detail_url(base_url: &str, link: &str) -> String {
    if link.starts_with("http") {
        return link.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = link.strip_prefix('/') {
        // Root-relative: join against the origin, not the full page URL.
        if let Ok(parsed) = url::Url::parse(base_url) {
            return format!("{}/{}", parsed.origin().ascii_serialization(), rest);
        }
        return format!("{base}/{rest}");
    }
    format!("{base}/{link}")
}

/// Pull every detail field out of one rendered page. Pure; the caller owns
/// navigation and settling.
pub fn extract_details(rules: &DetailRules, html: &str, property_url: &str) -> DetailBundle {
    let doc = Html::parse_document(html);
    let text = document_text(&doc);
    let mut bundle = DetailBundle {
        property_url: property_url.to_string(),
        ..Default::default()
    };

    // First selector producing non-empty text wins.
    for s in &rules.description_sels {
        if let Some(el) = doc.select(s).next() {
            let t = element_text(el);
            if !t.is_empty() {
                bundle.description = Some(t);
                break;
            }
        }
    }

    bundle.features = collect_items(&doc, &rules.feature_groups);
    bundle.amenities = collect_items(&doc, &rules.amenity_groups);

    bundle.images = doc
        .select(&rules.image_sel)
        .take(MAX_IMAGES)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(caps) = rules.sqft_re.captures(&text) {
        bundle.square_footage = Some(caps[1].to_string());
    }
    bundle.availability = first_match(&rules.availability_res, &text);
    bundle.pet_policy = first_match(&rules.pet_res, &text);
    if let Some(caps) = rules.deposit_re.captures(&text) {
        bundle.deposit = Some(caps[1].to_string());
    }
    if let Some(caps) = rules.lease_re.captures(&text) {
        bundle.lease_terms = Some(caps[1].to_string());
    }
    bundle.utilities = label_value(&rules.utilities_re, &text);
    bundle.parking = label_value(&rules.parking_re, &text);
    bundle.laundry = label_value(&rules.laundry_re, &text);

    bundle
}

/// Visit one detail page and extract from it. Never propagates an error;
/// any failure collapses into an error bundle so one bad page cannot sink
/// the run.
pub fn scrape_property_details(
    page: &crate::browser::PageHandle,
    rules: &DetailRules,
    link: &str,
    base_url: &str,
) -> DetailBundle {
    let detail_url = resolve_detail_url(base_url, link);

    if let Err(e) = page.navigate(&detail_url) {
        return DetailBundle::failure(detail_url, e.to_string());
    }
    page.wait(DETAIL_SETTLE_MS);
    match page.content() {
        Ok(html) => extract_details(rules, &html, &detail_url),
        Err(e) => DetailBundle::failure(detail_url, e.to_string()),
    }
}

/// First group yielding at least one item wins; the groups overlap, so
/// taking their union would report the same elements several times over.
fn collect_items(doc: &Html, groups: &[Selector]) -> Vec<String> {
    for group in groups {
        let items: Vec<String> = doc
            .select(group)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .take(MAX_FEATURES)
            .collect();
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

/// The whole match, not a capture group; phrase patterns like "pets allowed:
/// dogs only" keep their label in the stored value.
fn first_match(res: &[Regex], text: &str) -> Option<String> {
    for r in res {
        if let Some(m) = r.find(text) {
            return Some(m.as_str().trim().to_string());
        }
    }
    None
}

/// Labelled capture runs to end of line; trimmed and length-capped since a
/// missing newline would otherwise swallow half the page.
fn label_value(r: &Regex, text: &str) -> Option<String> {
    r.captures(text).map(|caps| trim_cap(&caps[1]))
}

fn trim_cap(value: &str) -> String {
    value.trim().chars().take(MAX_LABEL_VALUE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_detail_urls() {
        assert_eq!(
            resolve_detail_url("https://ex.com/home_rentals", "https://other.com/x"),
            "https://other.com/x"
        );
        assert_eq!(
            resolve_detail_url("https://ex.com/home_rentals", "/listings/5"),
            "https://ex.com/listings/5"
        );
        assert_eq!(
            resolve_detail_url("https://ex.com/home_rentals/", "listings/5"),
            "https://ex.com/home_rentals/listings/5"
        );
        // With the site origin as base, a bare-relative link lands at the
        // origin root.
        assert_eq!(
            resolve_detail_url("https://ex.com", "listings/5"),
            "https://ex.com/listings/5"
        );
    }

    #[test]
    fn extracts_fields_from_markup_and_text() {
        let rules = DetailRules::new().unwrap();
        let html = r#"
            <html><body>
              <div class="description">Bright corner unit near the park.</div>
              <ul class="features"><li>Dishwasher</li><li>Hardwood floors</li></ul>
              <img src="/img/property-1.jpg">
              <p>950 sq ft. Deposit: $1,200. Lease: 12 months.</p>
              <p>Utilities: water and garbage included</p>
              <p>Available now</p>
              <p>Pets allowed: cats only</p>
              <p>Laundry: in-unit washer and dryer</p>
            </body></html>"#;

        let bundle = extract_details(&rules, html, "https://ex.com/listings/5");
        assert_eq!(
            bundle.description.as_deref(),
            Some("Bright corner unit near the park.")
        );
        assert_eq!(bundle.features, vec!["Dishwasher", "Hardwood floors"]);
        assert_eq!(bundle.images, vec!["/img/property-1.jpg"]);
        assert_eq!(bundle.square_footage.as_deref(), Some("950"));
        assert_eq!(bundle.deposit.as_deref(), Some("1,200"));
        assert_eq!(bundle.lease_terms.as_deref(), Some("12 month"));
        assert_eq!(
            bundle.utilities.as_deref(),
            Some("water and garbage included")
        );
        assert_eq!(bundle.availability.as_deref(), Some("Available now"));
        assert_eq!(bundle.pet_policy.as_deref(), Some("Pets allowed: cats only"));
        assert_eq!(bundle.laundry.as_deref(), Some("in-unit washer and dryer"));
        assert!(bundle.error.is_none());
    }

    #[test]
    fn overlapping_feature_groups_do_not_repeat_items() {
        // One list matched by ".features", "[class*=\"feature\"]", and
        // "ul.features" at once; a second container only a later group
        // would reach.
        let rules = DetailRules::new().unwrap();
        let html = r#"
            <ul class="features"><li>Dishwasher</li><li>Hardwood floors</li></ul>
            <div class="property-features"><ul><li>Balcony</li></ul></div>"#;

        let bundle = extract_details(&rules, html, "https://ex.com/x");
        assert_eq!(bundle.features, vec!["Dishwasher", "Hardwood floors"]);
    }

    #[test]
    fn availability_label_and_catch_all_store_the_whole_match() {
        let rules = DetailRules::new().unwrap();

        let bundle = extract_details(&rules, "<p>Availability: 12/01/2025</p>", "u");
        assert_eq!(
            bundle.availability.as_deref(),
            Some("Availability: 12/01/2025")
        );

        let bundle = extract_details(&rules, "<p>This unit is available now</p>", "u");
        assert_eq!(bundle.availability.as_deref(), Some("available now"));

        let bundle = extract_details(&rules, "<p>Available March 1</p>", "u");
        assert_eq!(bundle.availability.as_deref(), Some("Available March 1"));
    }

    #[test]
    fn labeled_pet_policy_wins_over_species_mentions() {
        let rules = DetailRules::new().unwrap();

        let bundle = extract_details(&rules, "<p>Pet policy: dogs welcome</p>", "u");
        assert_eq!(bundle.pet_policy.as_deref(), Some("Pet policy: dogs welcome"));

        let bundle = extract_details(&rules, "<p>Cats welcome in this building</p>", "u");
        assert_eq!(bundle.pet_policy.as_deref(), Some("Cats welcome"));
    }

    #[test]
    fn laundry_needs_the_label_not_just_appliance_words() {
        let rules = DetailRules::new().unwrap();

        let bundle = extract_details(&rules, "<p>Washer and dryer hookups</p>", "u");
        assert!(bundle.laundry.is_none());

        let bundle = extract_details(&rules, "<p>Laundry: hookups in basement</p>", "u");
        assert_eq!(bundle.laundry.as_deref(), Some("hookups in basement"));
    }

    #[test]
    fn caps_features_and_images() {
        let rules = DetailRules::new().unwrap();
        let lis: String = (0..25).map(|i| format!("<li>Feature {i}</li>")).collect();
        let imgs: String = (0..12)
            .map(|i| format!(r#"<img src="/p/property-{i}.jpg">"#))
            .collect();
        let html = format!(r#"<ul class="features">{lis}</ul>{imgs}"#);

        let bundle = extract_details(&rules, &html, "https://ex.com/x");
        assert_eq!(bundle.features.len(), 20);
        assert_eq!(bundle.images.len(), 10);
    }
}
