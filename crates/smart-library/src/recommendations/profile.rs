use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::library::catalog::contains_folded;
use crate::library::{CatalogItem, Patron};

/// Snapshot of everything the filters and the scorer need to know about a reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReaderProfile {
    pub age: u32,
    /// Lowercased, blank tags dropped.
    pub interests: Vec<String>,
    pub favorite_categories: BTreeSet<String>,
    pub read_categories: BTreeSet<String>,
    /// Creators of returned loans whose items are still catalogued.
    pub read_creators: BTreeSet<String>,
    pub borrowed_keys: BTreeSet<String>,
    pub today: NaiveDate,
}

impl ReaderProfile {
    pub fn build(patron: &Patron, catalog: &[CatalogItem], today: NaiveDate) -> Self {
        let creators: HashMap<&str, &str> = catalog
            .iter()
            .map(|item| (item.key(), item.creator()))
            .collect();

        let read_creators = patron
            .loan_history()
            .iter()
            .filter_map(|record| creators.get(record.item_key.as_str()))
            .map(|creator| creator.to_string())
            .collect();

        let interests = patron
            .interests()
            .iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        Self {
            age: patron.age(),
            interests,
            favorite_categories: patron.favorite_categories().clone(),
            read_categories: patron.read_categories(),
            read_creators,
            borrowed_keys: patron
                .borrowed_keys()
                .into_iter()
                .map(str::to_string)
                .collect(),
            today,
        }
    }

    /// Category is either already read or marked as a favourite.
    pub fn prefers_category(&self, category: &str) -> bool {
        self.read_categories.contains(category) || self.favorite_categories.contains(category)
    }

    /// Some interest tag occurs in `text`, ignoring case.
    pub fn interested_in(&self, text: &str) -> bool {
        self.interests
            .iter()
            .any(|interest| contains_folded(text, interest))
    }

    pub fn has_read_creator(&self, creator: &str) -> bool {
        self.read_creators.contains(creator)
    }

    pub fn has_borrowed(&self, key: &str) -> bool {
        self.borrowed_keys.contains(key)
    }
}
