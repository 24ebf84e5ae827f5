use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::library::{
    CatalogItem, InMemoryAuditLog, InMemoryCatalogRepository, InMemoryPatronRepository,
    ItemDraft, ItemKind, LibraryService, PatronDetails,
};
use crate::recommendations::ReaderProfile;

pub(super) type MemoryLibrary =
    LibraryService<InMemoryPatronRepository, InMemoryCatalogRepository, InMemoryAuditLog>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn item(
    key: &str,
    category: Option<&str>,
    creator: &str,
    checkouts: u32,
    published_on: NaiveDate,
) -> CatalogItem {
    CatalogItem::new(ItemDraft {
        key: key.to_string(),
        title: format!("Volume {key}"),
        creator: creator.to_string(),
        published_on,
        category: category.map(str::to_string),
        kind: ItemKind::Book {
            page_count: 180,
            publisher: None,
            language: None,
        },
    })
    .with_checkout_count(checkouts)
}

pub(super) fn keys(items: &[CatalogItem]) -> Vec<&str> {
    items.iter().map(|item| item.key()).collect()
}

pub(super) fn reader(age: u32) -> ReaderProfile {
    ReaderProfile {
        age,
        interests: Vec::new(),
        favorite_categories: BTreeSet::new(),
        read_categories: BTreeSet::new(),
        read_creators: BTreeSet::new(),
        borrowed_keys: BTreeSet::new(),
        today: now().date_naive(),
    }
}

pub(super) fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn details(age: u32, interests: &[&str]) -> PatronDetails {
    PatronDetails {
        first_name: "Noor".to_string(),
        last_name: "Haddad".to_string(),
        email: "noor@example.org".to_string(),
        age,
        interests: set(interests),
        favorite_categories: BTreeSet::new(),
    }
}

pub(super) struct Fixture {
    pub(super) library: MemoryLibrary,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn library_with(items: Vec<CatalogItem>) -> Fixture {
    let clock = Arc::new(ManualClock::new(now()));
    let library = LibraryService::new(
        Arc::new(InMemoryPatronRepository::default()),
        Arc::new(InMemoryCatalogRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        clock.clone(),
    );
    for item in items {
        library.add_existing_item(item).expect("item added");
    }
    Fixture { library, clock }
}
