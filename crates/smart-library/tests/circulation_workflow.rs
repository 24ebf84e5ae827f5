use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use smart_library::clock::ManualClock;
use smart_library::library::{
    AuditEventKind, InMemoryAuditLog, InMemoryCatalogRepository, InMemoryPatronRepository,
    ItemDraft, ItemKind, LibraryService, PatronDetails,
};
use smart_library::reports;

fn draft(key: &str, title: &str, kind: ItemKind) -> ItemDraft {
    ItemDraft {
        key: key.to_string(),
        title: title.to_string(),
        creator: "K. Adeyemi".to_string(),
        published_on: NaiveDate::from_ymd_opt(2020, 10, 1).expect("valid date"),
        category: Some("Urban Studies".to_string()),
        kind,
    }
}

fn patron(first_name: &str) -> PatronDetails {
    PatronDetails {
        first_name: first_name.to_string(),
        last_name: "Brennan".to_string(),
        email: format!("{}@example.org", first_name.to_lowercase()),
        age: 44,
        interests: BTreeSet::new(),
        favorite_categories: BTreeSet::from(["Urban Studies".to_string()]),
    }
}

#[test]
fn a_month_of_circulation_produces_consistent_reports() {
    let opened = Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(opened));
    let audit = Arc::new(InMemoryAuditLog::default());
    let library = LibraryService::new(
        Arc::new(InMemoryPatronRepository::default()),
        Arc::new(InMemoryCatalogRepository::default()),
        audit.clone(),
        clock.clone(),
    );

    library
        .add_item(draft(
            "bk-100",
            "Streets for People",
            ItemKind::Book {
                page_count: 288,
                publisher: None,
                language: None,
            },
        ))
        .expect("book catalogued");
    library
        .add_item(draft(
            "pd-100",
            "Transit Quarterly",
            ItemKind::Periodical {
                issue_number: 12,
                frequency: Some("quarterly".to_string()),
                series_id: None,
            },
        ))
        .expect("periodical catalogued");

    let reader = library.register_patron(patron("Siobhan")).expect("registered");
    library.checkout(reader.id(), "bk-100").expect("book lent");
    library.checkout(reader.id(), "pd-100").expect("periodical lent");

    clock.advance(Duration::days(10));
    library.return_item(reader.id(), "pd-100").expect("late return accepted");

    clock.advance(Duration::days(20));
    let overdue = library.overdue_report().expect("overdue report");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].item_key, "bk-100");
    assert_eq!(overdue[0].overdue_days, 16);
    assert_eq!(overdue[0].penalty, 32);

    let summary = library.summary().expect("summary");
    assert_eq!(summary.total_checkouts, 2);
    assert_eq!(summary.total_penalties, 32);

    let csv = reports::overdue_report(&overdue, library.now()).expect("csv renders");
    assert!(csv.contains("Siobhan Brennan,Streets for People,16,32"));
    assert!(csv.contains("Total Penalty,32"));

    let counts = audit.daily_counts(opened.date_naive());
    assert_eq!(counts.get(&AuditEventKind::CheckedOut), Some(&2));
    assert_eq!(counts.get(&AuditEventKind::Returned), None);
}
