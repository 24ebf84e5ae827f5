use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use smart_library::clock::ManualClock;
use smart_library::library::{
    CatalogItem, InMemoryAuditLog, InMemoryCatalogRepository, InMemoryPatronRepository,
    ItemDraft, ItemKind, LibraryService, PatronDetails,
};
use smart_library::recommendations::ScoreFactor;

fn book(key: &str, category: &str, creator: &str, year: i32, checkouts: u32) -> CatalogItem {
    CatalogItem::new(ItemDraft {
        key: key.to_string(),
        title: format!("{category} notes {key}"),
        creator: creator.to_string(),
        published_on: NaiveDate::from_ymd_opt(year, 1, 15).expect("valid date"),
        category: Some(category.to_string()),
        kind: ItemKind::Book {
            page_count: 200,
            publisher: None,
            language: None,
        },
    })
    .with_checkout_count(checkouts)
}

#[test]
fn reading_history_shapes_later_recommendations() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap(),
    ));
    let library = LibraryService::new(
        Arc::new(InMemoryPatronRepository::default()),
        Arc::new(InMemoryCatalogRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
        clock.clone(),
    );
    for item in [
        book("g-1", "Gardening", "P. Moreau", 2016, 12),
        book("g-2", "Gardening", "P. Moreau", 2018, 30),
        book("g-3", "Gardening", "J. Tan", 2012, 90),
        book("c-1", "Cooking", "L. Ferri", 2019, 150),
        book("c-2", "Cooking", "L. Ferri", 2021, 60),
        book("h-1", "History", "E. Dunne", 2010, 5),
    ] {
        library.add_existing_item(item).expect("catalogued");
    }

    let reader = library
        .register_patron(PatronDetails {
            first_name: "Oskar".to_string(),
            last_name: "Lund".to_string(),
            email: "oskar@example.org".to_string(),
            age: 52,
            interests: BTreeSet::new(),
            favorite_categories: BTreeSet::new(),
        })
        .expect("registered");

    let before = library
        .recommendations()
        .recommend(reader.id(), 3)
        .expect("recommendations");
    assert!(before
        .iter()
        .all(|r| r.components.iter().all(|c| c.factor == ScoreFactor::Popularity)));

    library.checkout(reader.id(), "g-1").expect("lent");
    clock.advance(Duration::days(5));
    library.return_item(reader.id(), "g-1").expect("returned");

    let after = library
        .recommendations()
        .recommend(reader.id(), 3)
        .expect("recommendations");
    let keys: Vec<&str> = after.iter().map(|r| r.item.key()).collect();
    assert!(!keys.contains(&"g-1"));
    assert_eq!(after[0].item.key(), "g-2");
    assert!(after[0]
        .components
        .iter()
        .any(|c| c.factor == ScoreFactor::CreatorFamiliarity));
    assert!(after.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(
        after.iter().map(|r| r.rank).collect::<Vec<_>>(),
        (1..=after.len()).collect::<Vec<_>>()
    );
}
