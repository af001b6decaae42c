//! Deduplication and aggregation store
//!
//! An explicit store object threaded through the pipeline stages - never a
//! module-level global - so unit tests and partitioned extensions stay
//! clean. Membership checks are O(1) hash-set lookups; a linear scan over
//! all previously seen records would fall over on real catalogs.

use log::trace;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

use crate::extractor::{Record, page_key};

/// Which record field decides whether two records are the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKey {
    /// Display title. Matches the historical behavior, but distinct entries
    /// can share a title.
    Title,
    /// Entity link. Stable across title collisions; the default.
    Link,
}

impl IdentityKey {
    fn of(self, record: &Record) -> String {
        match self {
            Self::Title => record.title.clone(),
            Self::Link => record.link.clone(),
        }
    }
}

/// Page-keyed collection of all accepted records for one run. Keyed by the
/// numeric ordinal so `page-2` orders before `page-10` in the output.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pages: BTreeMap<u32, Vec<Record>>,
}

impl Aggregate {
    /// Iterate buckets in page order.
    pub fn pages(&self) -> impl Iterator<Item = (u32, &[Record])> {
        self.pages.iter().map(|(ordinal, records)| (*ordinal, records.as_slice()))
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn total_records(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Build the output document: one object with `"page-<n>"` keys in page
    /// order, each an array of record objects.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        for (ordinal, records) in &self.pages {
            let bucket = records
                .iter()
                .map(|record| serde_json::to_value(record).unwrap_or(Value::Null))
                .collect();
            doc.insert(page_key(*ordinal), Value::Array(bucket));
        }
        Value::Object(doc)
    }
}

/// Aggregate plus the monotonically growing set of identity keys already
/// accepted. The visited set lives for one run and is never persisted.
#[derive(Debug)]
pub struct DedupStore {
    aggregate: Aggregate,
    visited: HashSet<String>,
    identity: IdentityKey,
}

impl DedupStore {
    #[must_use]
    pub fn new(identity: IdentityKey) -> Self {
        Self {
            aggregate: Aggregate::default(),
            visited: HashSet::new(),
            identity,
        }
    }

    /// Insert a record into the given page bucket unless its identity key
    /// has already been accepted. Returns whether the record was accepted.
    pub fn insert(&mut self, ordinal: u32, record: Record) -> bool {
        let key = self.identity.of(&record);
        if !self.visited.insert(key) {
            trace!("Rejected duplicate '{}' on page {ordinal}", record.title);
            return false;
        }
        self.aggregate
            .pages
            .entry(ordinal)
            .or_default()
            .push(record);
        true
    }

    #[must_use]
    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    /// Hand the aggregate to persistence; the visited set is discarded.
    #[must_use]
    pub fn into_aggregate(self) -> Aggregate {
        self.aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, link: &str) -> Record {
        Record {
            title: title.to_string(),
            image: None,
            link: link.to_string(),
        }
    }

    #[test]
    fn accepts_new_rejects_seen() {
        let mut store = DedupStore::new(IdentityKey::Link);
        assert!(store.insert(1, record("Naruto", "https://site.to/naruto")));
        assert!(!store.insert(1, record("Naruto", "https://site.to/naruto")));
        assert!(!store.insert(2, record("Naruto again", "https://site.to/naruto")));
        assert_eq!(store.aggregate().total_records(), 1);
    }

    #[test]
    fn link_identity_keeps_title_collisions() {
        let mut store = DedupStore::new(IdentityKey::Link);
        assert!(store.insert(1, record("Hunter x Hunter", "https://site.to/hxh-1999")));
        assert!(store.insert(1, record("Hunter x Hunter", "https://site.to/hxh-2011")));
        assert_eq!(store.aggregate().total_records(), 2);
    }

    #[test]
    fn title_identity_merges_title_collisions() {
        let mut store = DedupStore::new(IdentityKey::Title);
        assert!(store.insert(1, record("Hunter x Hunter", "https://site.to/hxh-1999")));
        assert!(!store.insert(1, record("Hunter x Hunter", "https://site.to/hxh-2011")));
        assert_eq!(store.aggregate().total_records(), 1);
    }

    #[test]
    fn buckets_created_on_demand_and_ordered() {
        let mut store = DedupStore::new(IdentityKey::Link);
        store.insert(10, record("J", "https://site.to/j"));
        store.insert(2, record("B", "https://site.to/b"));
        store.insert(2, record("B2", "https://site.to/b2"));

        let aggregate = store.into_aggregate();
        let ordinals: Vec<u32> = aggregate.pages().map(|(n, _)| n).collect();
        assert_eq!(ordinals, vec![2, 10]);

        let json = aggregate.to_json();
        let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
        assert_eq!(keys, ["page-2", "page-10"]);
        assert_eq!(json["page-2"].as_array().expect("array").len(), 2);
    }

    #[test]
    fn no_duplicate_identity_keys_across_buckets() {
        let mut store = DedupStore::new(IdentityKey::Link);
        for page in 1..=5u32 {
            for item in 0..4 {
                // Every page repeats the previous page's last record.
                let id = page * 10 + item;
                store.insert(page, record(&format!("T{id}"), &format!("https://s.to/{id}")));
            }
            store.insert(page, record("repeat", "https://s.to/repeat"));
        }

        let aggregate = store.into_aggregate();
        let mut seen = HashSet::new();
        for (_, records) in aggregate.pages() {
            for r in records {
                assert!(seen.insert(r.link.clone()), "duplicate link {}", r.link);
            }
        }
        assert_eq!(seen.len(), aggregate.total_records());
    }
}
