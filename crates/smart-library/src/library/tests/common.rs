use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::clock::ManualClock;
use crate::library::repository::{PatronRepository, RepositoryError};
use crate::library::{
    InMemoryAuditLog, InMemoryCatalogRepository, InMemoryPatronRepository, ItemDraft, ItemKind,
    LibraryService, Patron, PatronDetails, PatronId,
};

pub(super) type MemoryLibrary =
    LibraryService<InMemoryPatronRepository, InMemoryCatalogRepository, InMemoryAuditLog>;

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

pub(super) struct Fixture {
    pub(super) service: Arc<MemoryLibrary>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) audit: Arc<InMemoryAuditLog>,
    pub(super) catalog: Arc<InMemoryCatalogRepository>,
}

pub(super) fn build_service() -> Fixture {
    let clock = Arc::new(ManualClock::new(start()));
    let audit = Arc::new(InMemoryAuditLog::default());
    let catalog = Arc::new(InMemoryCatalogRepository::default());
    let service = Arc::new(LibraryService::new(
        Arc::new(InMemoryPatronRepository::default()),
        catalog.clone(),
        audit.clone(),
        clock.clone(),
    ));
    Fixture {
        service,
        clock,
        audit,
        catalog,
    }
}

pub(super) fn book(key: &str, title: &str, creator: &str, category: &str) -> ItemDraft {
    ItemDraft {
        key: key.to_string(),
        title: title.to_string(),
        creator: creator.to_string(),
        published_on: NaiveDate::from_ymd_opt(2019, 3, 14).expect("valid date"),
        category: Some(category.to_string()),
        kind: ItemKind::Book {
            page_count: 320,
            publisher: Some("Harbor Press".to_string()),
            language: Some("en".to_string()),
        },
    }
}

pub(super) fn periodical(key: &str, title: &str) -> ItemDraft {
    ItemDraft {
        key: key.to_string(),
        title: title.to_string(),
        creator: "Editorial Board".to_string(),
        published_on: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
        category: Some("Science".to_string()),
        kind: ItemKind::Periodical {
            issue_number: 42,
            frequency: Some("monthly".to_string()),
            series_id: None,
        },
    }
}

pub(super) fn thesis(key: &str, title: &str) -> ItemDraft {
    ItemDraft {
        key: key.to_string(),
        title: title.to_string(),
        creator: "M. Okafor".to_string(),
        published_on: NaiveDate::from_ymd_opt(2023, 9, 1).expect("valid date"),
        category: Some("Engineering".to_string()),
        kind: ItemKind::Thesis {
            institution: Some("Northfield University".to_string()),
            department: None,
            advisor: None,
            degree_level: Some("PhD".to_string()),
        },
    }
}

pub(super) fn details(first_name: &str, age: u32) -> PatronDetails {
    PatronDetails {
        first_name: first_name.to_string(),
        last_name: "Lindqvist".to_string(),
        email: format!("{}@example.org", first_name.to_lowercase()),
        age,
        interests: BTreeSet::from(["history".to_string()]),
        favorite_categories: BTreeSet::new(),
    }
}

pub(super) fn stocked_service() -> (Fixture, PatronId) {
    let fixture = build_service();
    fixture
        .service
        .add_item(book("bk-1", "Salt and Empire", "R. Castellanos", "History"))
        .expect("book added");
    fixture
        .service
        .add_item(periodical("pd-1", "Field Notes Monthly"))
        .expect("periodical added");
    fixture
        .service
        .add_item(thesis("th-1", "Load Paths in Timber Frames"))
        .expect("thesis added");
    let patron = fixture
        .service
        .register_patron(details("Ingrid", 34))
        .expect("patron registered");
    let id = patron.id().clone();
    (fixture, id)
}

/// Patron store whose updates can be switched to fail after setup.
#[derive(Default)]
pub(super) struct FlakyPatronRepository {
    pub(super) inner: InMemoryPatronRepository,
    pub(super) fail_updates: AtomicBool,
}

impl FlakyPatronRepository {
    pub(super) fn start_failing(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

impl PatronRepository for FlakyPatronRepository {
    fn insert(&self, patron: Patron) -> Result<Patron, RepositoryError> {
        self.inner.insert(patron)
    }

    fn update(&self, patron: Patron) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("patron store offline".to_string()));
        }
        self.inner.update(patron)
    }

    fn fetch(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list(&self) -> Result<Vec<Patron>, RepositoryError> {
        self.inner.list()
    }

    fn remove(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError> {
        self.inner.remove(id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_conflict_response(response: &Response) {
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
