// src/scraper/models.rs

use serde::Serialize;
use std::collections::HashMap;

/// One rental listing, keyed by the site's `listable_uid` token and filled in
/// progressively: link during discovery, summary fields from the listing
/// card, detail fields from the property page. Fields the heuristics could
/// not find simply stay `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropertyRecord {
    #[serde(skip)]
    pub uid: String,

    // Card-level fields; written at most once (first writer wins).
    pub address: Option<String>,
    pub price: Option<String>,
    pub beds: Option<String>,
    pub baths: Option<String>,
    pub property_link: Option<String>,

    // Detail-page fields; only serialized once enrichment has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_footage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_terms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laundry: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Set only when enrichment failed for this record; detail fields stay
    /// empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PropertyRecord {
    pub fn new(uid: &str) -> Self {
        PropertyRecord {
            uid: uid.to_string(),
            ..Default::default()
        }
    }

    /// Inclusion filter applied once, at assembly time: a record makes the
    /// final listing if it has a detail link or at least one summary field.
    pub fn qualifies(&self) -> bool {
        self.property_link.is_some() || self.address.is_some() || self.price.is_some()
    }

    /// Merge an enrichment result. Unlike card harvesting this is a full
    /// overwrite of same-named fields, preserved as observed in the source
    /// site's behavior. An error bundle sets `error` and nothing else.
    pub fn apply_detail(&mut self, bundle: DetailBundle) {
        if let Some(err) = bundle.error {
            self.error = Some(err);
            return;
        }
        self.description = bundle.description;
        self.features = bundle.features;
        self.amenities = bundle.amenities;
        self.square_footage = bundle.square_footage;
        self.availability = bundle.availability;
        self.pet_policy = bundle.pet_policy;
        self.deposit = bundle.deposit;
        self.lease_terms = bundle.lease_terms;
        self.utilities = bundle.utilities;
        self.parking = bundle.parking;
        self.laundry = bundle.laundry;
        self.images = bundle.images;
    }
}

/// Everything a detail-page visit can yield. `error` is mutually exclusive
/// with the other fields by construction (a failed visit returns an error
/// bundle with nothing else populated).
#[derive(Debug, Default)]
pub struct DetailBundle {
    pub property_url: String,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub amenities: Vec<String>,
    pub square_footage: Option<String>,
    pub availability: Option<String>,
    pub pet_policy: Option<String>,
    pub deposit: Option<String>,
    pub lease_terms: Option<String>,
    pub utilities: Option<String>,
    pub parking: Option<String>,
    pub laundry: Option<String>,
    pub images: Vec<String>,
    pub error: Option<String>,
}

impl DetailBundle {
    pub fn failure(property_url: String, message: String) -> Self {
        DetailBundle {
            property_url,
            error: Some(message),
            ..Default::default()
        }
    }
}

/// Insertion-ordered record store keyed by uid. Discovery and enrichment are
/// two passes over the same store; the key set never shrinks during a run.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<PropertyRecord>,
    index: HashMap<String, usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore::default()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    /// Insert-if-absent; always hands back the record for `uid`.
    pub fn insert(&mut self, uid: &str) -> &mut PropertyRecord {
        if !self.index.contains_key(uid) {
            self.index.insert(uid.to_string(), self.records.len());
            self.records.push(PropertyRecord::new(uid));
        }
        let i = self.index[uid];
        &mut self.records[i]
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut PropertyRecord> {
        let i = *self.index.get(uid)?;
        Some(&mut self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [PropertyRecord] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<PropertyRecord> {
        self.records
    }
}

/// Page-level contact details, independent of any property record.
#[derive(Debug, Default, Serialize)]
pub struct ContactInfo {
    pub phone: Vec<String>,
    pub email: Vec<String>,
    pub address: Vec<String>,
}

const EMPTY_NOTE: &str = "No structured rental listings found on page. Page may load listings \
     dynamically via JavaScript. Contact information extracted from page.";

/// Final immutable snapshot handed to the CLI layer.
#[derive(Debug, Serialize)]
pub struct ScrapeResult {
    pub scraped_at: String,
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub contact_info: ContactInfo,
    pub rental_listings: Vec<PropertyRecord>,
    pub listing_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ScrapeResult {
    /// Applies the inclusion filter (once, after enrichment), preserving
    /// discovery order. An empty listing is annotated, not treated as an
    /// error.
    pub fn assemble(
        url: &str,
        title: Option<String>,
        description: Option<String>,
        contact_info: ContactInfo,
        store: RecordStore,
    ) -> Self {
        let rental_listings: Vec<PropertyRecord> = store
            .into_records()
            .into_iter()
            .filter(PropertyRecord::qualifies)
            .collect();
        let listing_count = rental_listings.len();
        let note = if rental_listings.is_empty() {
            Some(EMPTY_NOTE.to_string())
        } else {
            None
        };

        ScrapeResult {
            scraped_at: chrono::Local::now().to_rfc3339(),
            url: url.to_string(),
            title,
            description,
            contact_info,
            rental_listings,
            listing_count,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_preserves_insertion_order_and_dedups() {
        let mut store = RecordStore::new();
        store.insert("b").property_link = Some("/b".into());
        store.insert("a").property_link = Some("/a".into());
        // Re-inserting an existing uid must not add a record or move it.
        store.insert("b");
        assert_eq!(store.len(), 2);
        let uids: Vec<&str> = store.records().iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, ["b", "a"]);
    }

    #[test]
    fn inclusion_filter_keeps_link_only_records() {
        let mut store = RecordStore::new();
        store.insert("with-link").property_link = Some("/x".into());
        store.insert("with-price").price = Some("$900".into());
        store.insert("empty");

        let result = ScrapeResult::assemble("https://ex.com", None, None, ContactInfo::default(), store);
        assert_eq!(result.listing_count, 2);
        assert!(result.note.is_none());
        let uids: Vec<&str> = result.rental_listings.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, ["with-link", "with-price"]);
    }

    #[test]
    fn empty_listing_gets_a_note() {
        let mut store = RecordStore::new();
        store.insert("empty");
        let result = ScrapeResult::assemble("https://ex.com", None, None, ContactInfo::default(), store);
        assert_eq!(result.listing_count, 0);
        assert!(result.note.is_some());
    }

    #[test]
    fn detail_merge_overwrites_and_error_suppresses_fields() {
        let mut rec = PropertyRecord::new("u");
        rec.description = Some("stale".into());

        let mut good = DetailBundle::default();
        good.description = Some("fresh".into());
        good.features = vec!["garage".into()];
        rec.apply_detail(good);
        assert_eq!(rec.description.as_deref(), Some("fresh"));
        assert_eq!(rec.features, ["garage"]);

        let mut failed = PropertyRecord::new("v");
        failed.apply_detail(DetailBundle::failure("https://ex.com/v".into(), "timeout".into()));
        assert_eq!(failed.error.as_deref(), Some("timeout"));
        assert!(failed.description.is_none());
        assert!(failed.features.is_empty());
    }
}
