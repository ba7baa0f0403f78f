// src/scraper/discovery.rs
//
// Virtualized-list discovery. Only the rows near the viewport exist in the
// DOM at any moment, so enumeration works by driving the scroll position:
// saturate the list by visiting the bottom repeatedly, then sweep back up in
// small steps, snapshotting the DOM at each stop.

use regex::Regex;
use ::scraper::Selector;

use super::cards::CardRules;
use super::models::RecordStore;
use super::ScraperError;
use super::{re, sel, ts};

const DESCENT_ROUNDS: usize = 10;
const DESCENT_SETTLE_MS: u64 = 2000;
const OVERSCROLL_PX: i64 = 1000;
const OVERSCROLL_SETTLE_MS: u64 = 1500;
const BOTTOM_SETTLE_MS: u64 = 5000;

const ASCENT_STEP_PX: i64 = 150;
const POSITION_SETTLE_MS: u64 = 3000;
const SNAPSHOTS_PER_POSITION: usize = 3;
const SNAPSHOT_PAUSE_MS: u64 = 1500;

// Stall thresholds. The counter resets only when a new identifier shows up
// or the page grows, so each threshold fires at an exact count.
const STALL_JUMP_AT: u32 = 15;
const STALL_JUMP_PX: i64 = 2000;
const JUMP_SETTLE_MS: u64 = 4000;
const STALL_RESYNC_AT: u32 = 30;
const RESYNC_SETTLE_MS: u64 = 5000;
const STALL_LIMIT: u32 = 150;

/// What discovery needs from the live listing page. Scroll position is
/// shared mutable state on one page, so discovery is strictly sequential;
/// all pacing waits route through `settle` so tests can run a synthetic
/// surface without sleeping.
pub trait ScrollSurface {
    fn scroll_to(&self, y: i64) -> Result<(), ScraperError>;
    fn scroll_by(&self, delta: i64) -> Result<(), ScraperError>;
    fn scroll_to_bottom(&self) -> Result<(), ScraperError>;
    fn scroll_height(&self) -> Result<i64, ScraperError>;
    fn scroll_offset(&self) -> Result<i64, ScraperError>;
    fn visible_text(&self) -> Result<String, ScraperError>;
    fn snapshot(&self) -> Result<String, ScraperError>;
    fn settle(&self, ms: u64);
}

struct DiscoveryRules {
    anchor_sel: Selector,
    script_sel: Selector,
    uid_in_href: Regex,
    uid_in_script: Regex,
    count_re: Regex,
}

impl DiscoveryRules {
    fn new() -> Result<Self, ScraperError> {
        Ok(DiscoveryRules {
            anchor_sel: sel(r#"a[href*="listable_uid"]"#)?,
            script_sel: sel("script")?,
            uid_in_href: re(r"listable_uid=([a-f0-9-]+)")?,
            uid_in_script: re(r"listable_uid=([a-f0-9-]{36})")?,
            count_re: re(r"(\d+)\s+of\s+(\d+)")?,
        })
    }
}

/// Enumerate every property the listing page knows about, harvesting card
/// fields along the way. Returns a deduplicated, insertion-ordered store of
/// partially-populated records.
pub fn discover<S: ScrollSurface>(
    surface: &S,
    base_origin: &str,
) -> Result<RecordStore, ScraperError> {
    let rules = DiscoveryRules::new()?;
    let cards = CardRules::new()?;
    let mut store = RecordStore::new();

    // Many sites show "Showing X of Y results"; Y is the target count.
    let target = infer_target_count(&rules, &surface.visible_text()?);
    if let Some(t) = target {
        eprintln!("[{}] Target: {} properties", ts(), t);
    }

    // Rows the client state has pre-loaded but not painted yet still leak
    // their uid through inline script text; seed those before scrolling.
    eprintln!("[{}] Checking inline script state for property ids...", ts());
    let seeded = seed_from_embedded_state(&surface.snapshot()?, &rules, base_origin, &mut store);
    if seeded > 0 {
        eprintln!("[{}] Found {} property ids in script state", ts(), seeded);
    }

    // Step 1: saturation descent. Page height can keep growing as rows are
    // appended lazily, so visit the bottom several times, overscrolling past
    // it to provoke load-on-overscroll implementations.
    eprintln!(
        "[{}] Step 1: Scrolling to absolute bottom to trigger all items...",
        ts()
    );
    for _ in 0..DESCENT_ROUNDS {
        surface.scroll_to_bottom()?;
        surface.settle(DESCENT_SETTLE_MS);
        surface.scroll_by(OVERSCROLL_PX)?;
        surface.settle(OVERSCROLL_SETTLE_MS);
    }
    eprintln!("[{}] Waiting at bottom for all items to load...", ts());
    surface.settle(BOTTOM_SETTLE_MS);

    let mut max_scroll = surface.scroll_height()?;
    eprintln!(
        "[{}] Page height after bottom scroll: {}px",
        ts(),
        max_scroll
    );

    // Step 2: ascent sweep. Rows re-paint asynchronously relative to the
    // scroll event, so each stop gets several snapshots.
    eprintln!(
        "[{}] Step 2: Scrolling back up slowly to capture all properties...",
        ts()
    );
    let mut pos = max_scroll;
    let mut stalls: u32 = 0;

    while pos > 0 && stalls < STALL_LIMIT && target.map_or(true, |t| store.len() < t) {
        surface.scroll_to(pos)?;
        surface.settle(POSITION_SETTLE_MS);

        let mut found_new = false;
        for check in 0..SNAPSHOTS_PER_POSITION {
            if check > 0 {
                surface.settle(SNAPSHOT_PAUSE_MS);
            }
            let html = surface.snapshot()?;
            if harvest_snapshot(&html, &rules, &cards, &mut store, true, pos, check) {
                found_new = true;
            }
            if found_new && target.map_or(false, |t| store.len() >= t) {
                break;
            }
        }

        if found_new {
            stalls = 0;
        } else {
            stalls += 1;
            if stalls % 10 == 0 {
                let want = target.map_or_else(|| "?".to_string(), |t| t.to_string());
                eprintln!(
                    "[{}] No new properties for {} checks at scroll {}px (have {}/{})",
                    ts(),
                    stalls,
                    pos,
                    store.len(),
                    want
                );
            }
        }

        pos = (pos - ASCENT_STEP_PX).max(0);

        if let Some(t) = target {
            if store.len() >= t {
                eprintln!("[{}] ✓ Reached target of {} properties!", ts(), t);
                break;
            }
        }

        // Growth means the list is still materializing; stalls measured
        // before growth were not meaningful.
        let current_height = surface.scroll_height()?;
        if current_height > max_scroll {
            max_scroll = current_height;
            stalls = 0;
            eprintln!(
                "[{}] Page height increased to {}px, resetting stall counter",
                ts(),
                max_scroll
            );
        }

        if stalls == STALL_JUMP_AT {
            eprintln!(
                "[{}] ⚠️ No new properties for {} checks. Trying larger jumps...",
                ts(),
                STALL_JUMP_AT
            );
            pos = (pos + STALL_JUMP_PX).min(max_scroll);
            surface.scroll_to(pos)?;
            surface.settle(JUMP_SETTLE_MS);
        } else if stalls == STALL_RESYNC_AT {
            eprintln!("[{}] Still stuck. Scrolling to absolute bottom...", ts());
            surface.scroll_to_bottom()?;
            surface.settle(RESYNC_SETTLE_MS);
            pos = surface.scroll_offset()?;
            max_scroll = surface.scroll_height()?;
        }
    }

    eprintln!(
        "[{}] Finished scrolling. Collected {} properties",
        ts(),
        store.len()
    );

    fill_missing_cards(surface, &rules, &cards, &mut store, target, max_scroll)?;

    eprintln!("[{}] ✓ Collected {} unique properties", ts(), store.len());
    Ok(store)
}

/// Second number of the first "<seen> of <total>" phrase, if any. Brittle
/// against alternate phrasings; kept as-is rather than guessed at.
fn infer_target_count(rules: &DiscoveryRules, text: &str) -> Option<usize> {
    rules
        .count_re
        .captures(text)
        .and_then(|caps| caps[2].parse().ok())
}

/// Scan inline script text for identifier tokens and seed link-only records
/// for them, using the site's known detail-link shape.
fn seed_from_embedded_state(
    html: &str,
    rules: &DiscoveryRules,
    base_origin: &str,
    store: &mut RecordStore,
) -> usize {
    let doc = ::scraper::Html::parse_document(html);
    let mut seeded = 0;
    for script in doc.select(&rules.script_sel) {
        let text: String = script.text().collect();
        for caps in rules.uid_in_script.captures_iter(&text) {
            let uid = &caps[1];
            if !store.contains(uid) {
                let record = store.insert(uid);
                record.property_link = Some(format!(
                    "{base_origin}/listings/rental_applications/new?listable_uid={uid}&source=Website"
                ));
                seeded += 1;
            }
        }
    }
    seeded
}

/// Select every identifier-bearing anchor in one DOM snapshot. New uids get
/// link-only records (when `discover_new`); any anchor whose record still
/// lacks address or price gets a card-harvest pass. Returns whether a new
/// identifier was recorded.
fn harvest_snapshot(
    html: &str,
    rules: &DiscoveryRules,
    cards: &CardRules,
    store: &mut RecordStore,
    discover_new: bool,
    pos: i64,
    check: usize,
) -> bool {
    let doc = ::scraper::Html::parse_document(html);
    let mut found_new = false;

    for anchor in doc.select(&rules.anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(caps) = rules.uid_in_href.captures(href) else {
            continue;
        };
        let uid = caps[1].to_string();

        if !store.contains(&uid) {
            if !discover_new {
                continue;
            }
            let record = store.insert(&uid);
            record.property_link = Some(href.to_string());
            found_new = true;

            let count = store.len();
            if count % 5 == 0 || count <= 10 {
                let short: String = uid.chars().take(20).collect();
                eprintln!(
                    "[{}] Found property #{} at scroll {}px (check {}): {}...",
                    ts(),
                    count,
                    pos,
                    check + 1,
                    short
                );
            }
        }

        if let Some(record) = store.get_mut(&uid) {
            if record.address.is_none() || record.price.is_none() {
                cards.harvest(anchor, record);
            }
        }
    }

    found_new
}

/// Records seeded from script state may never have had their card painted
/// during the ascent. Sweep a handful of evenly-spaced positions and harvest
/// cards for whatever is still missing both address and price.
fn fill_missing_cards<S: ScrollSurface>(
    surface: &S,
    rules: &DiscoveryRules,
    cards: &CardRules,
    store: &mut RecordStore,
    target: Option<usize>,
    max_scroll: i64,
) -> Result<(), ScraperError> {
    let missing = store
        .records()
        .iter()
        .filter(|r| r.address.is_none() && r.price.is_none())
        .count();
    if missing == 0 {
        return Ok(());
    }

    eprintln!(
        "[{}] {} properties need card extraction. Scrolling to find them...",
        ts(),
        missing
    );

    let positions = usize::max(5, target.unwrap_or(68) / 24 + 2);
    for i in 0..positions {
        let pos = (i as i64) * max_scroll / (positions as i64 - 1);
        surface.scroll_to(pos)?;
        surface.settle(POSITION_SETTLE_MS);
        let html = surface.snapshot()?;
        harvest_snapshot(&html, rules, cards, store, false, pos, 0);
    }
    Ok(())
}
