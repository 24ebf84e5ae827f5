use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use smart_library::clock::Clock;
use smart_library::library::{
    CatalogItem, CirculationError, InMemoryAuditLog, InMemoryCatalogRepository,
    InMemoryPatronRepository, ItemDraft, ItemKind, LibraryService, PatronDetails, PatronId,
};
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Library =
    LibraryService<InMemoryPatronRepository, InMemoryCatalogRepository, InMemoryAuditLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) audit: Arc<InMemoryAuditLog>,
    pub(crate) library: Arc<Library>,
}

/// Lending service over fresh in-memory stores, plus the audit log it writes to.
pub(crate) fn build_library(clock: Arc<dyn Clock>) -> (Arc<Library>, Arc<InMemoryAuditLog>) {
    let audit = Arc::new(InMemoryAuditLog::default());
    let library = Arc::new(LibraryService::new(
        Arc::new(InMemoryPatronRepository::default()),
        Arc::new(InMemoryCatalogRepository::default()),
        audit.clone(),
        clock,
    ));
    (library, audit)
}

struct SampleItem {
    key: &'static str,
    title: &'static str,
    creator: &'static str,
    published: (i32, u32, u32),
    category: &'static str,
    checkouts: u32,
    kind: ItemKind,
}

fn book(pages: u32) -> ItemKind {
    ItemKind::Book {
        page_count: pages,
        publisher: None,
        language: Some("en".to_string()),
    }
}

fn sample_items() -> Vec<SampleItem> {
    vec![
        SampleItem {
            key: "978-0-14-118776-1",
            title: "Nineteen Eighty-Four",
            creator: "George Orwell",
            published: (1949, 6, 8),
            category: "Classic Literature",
            checkouts: 240,
            kind: book(328),
        },
        SampleItem {
            key: "978-0-14-118704-4",
            title: "Animal Farm",
            creator: "George Orwell",
            published: (1945, 8, 17),
            category: "Classic Literature",
            checkouts: 185,
            kind: book(112),
        },
        SampleItem {
            key: "978-0-06-231609-7",
            title: "Sapiens",
            creator: "Yuval Noah Harari",
            published: (2014, 9, 4),
            category: "History",
            checkouts: 160,
            kind: book(443),
        },
        SampleItem {
            key: "978-0-393-35432-0",
            title: "The Gene",
            creator: "Siddhartha Mukherjee",
            published: (2016, 5, 17),
            category: "Science",
            checkouts: 95,
            kind: book(592),
        },
        SampleItem {
            key: "978-1-250-30170-7",
            title: "Klara and the Sun",
            creator: "Kazuo Ishiguro",
            published: (2021, 3, 2),
            category: "Fiction",
            checkouts: 70,
            kind: book(303),
        },
        SampleItem {
            key: "978-0-593-31840-6",
            title: "Tomorrow, and Tomorrow, and Tomorrow",
            creator: "Gabrielle Zevin",
            published: (2022, 7, 5),
            category: "Fiction",
            checkouts: 55,
            kind: book(416),
        },
        SampleItem {
            key: "ISSN-0036-8733-2024-11",
            title: "Scientific American, November",
            creator: "Scientific American Editors",
            published: (2024, 11, 1),
            category: "Science",
            checkouts: 18,
            kind: ItemKind::Periodical {
                issue_number: 11,
                frequency: Some("monthly".to_string()),
                series_id: Some("0036-8733".to_string()),
            },
        },
        SampleItem {
            key: "ISSN-0028-0836-2025-02",
            title: "Nature, February",
            creator: "Nature Editors",
            published: (2025, 2, 6),
            category: "Science",
            checkouts: 9,
            kind: ItemKind::Periodical {
                issue_number: 8049,
                frequency: Some("weekly".to_string()),
                series_id: Some("0028-0836".to_string()),
            },
        },
        SampleItem {
            key: "THESIS-2023-CS-014",
            title: "Graph Methods for Library Recommendation",
            creator: "Elif Demir",
            published: (2023, 6, 20),
            category: "Computer Science",
            checkouts: 12,
            kind: ItemKind::Thesis {
                institution: Some("Ankara University".to_string()),
                department: Some("Computer Engineering".to_string()),
                advisor: Some("Prof. A. Yilmaz".to_string()),
                degree_level: Some("MSc".to_string()),
            },
        },
        SampleItem {
            key: "THESIS-2019-HI-003",
            title: "Ottoman Trade Routes in the Eighteenth Century",
            creator: "Murat Kaya",
            published: (2019, 1, 10),
            category: "History",
            checkouts: 4,
            kind: ItemKind::Thesis {
                institution: Some("Bogazici University".to_string()),
                department: Some("History".to_string()),
                advisor: None,
                degree_level: Some("PhD".to_string()),
            },
        },
    ]
}

/// Load the sample catalog, returning how many items were added.
pub(crate) fn seed_catalog(library: &Library) -> Result<usize, CirculationError> {
    let mut added = 0;
    for sample in sample_items() {
        let (year, month, day) = sample.published;
        let published_on = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            CirculationError::InvalidItem(format!("{} has an invalid publication date", sample.key))
        })?;
        let item = CatalogItem::new(ItemDraft {
            key: sample.key.to_string(),
            title: sample.title.to_string(),
            creator: sample.creator.to_string(),
            published_on,
            category: Some(sample.category.to_string()),
            kind: sample.kind,
        })
        .with_checkout_count(sample.checkouts);
        library.add_existing_item(item)?;
        added += 1;
    }
    Ok(added)
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Register a teenage and an adult reader for demos.
pub(crate) fn seed_patrons(library: &Library) -> Result<Vec<PatronId>, CirculationError> {
    let readers = [
        PatronDetails {
            first_name: "Deniz".to_string(),
            last_name: "Arslan".to_string(),
            email: "deniz.arslan@example.org".to_string(),
            age: 16,
            interests: tags(&["fiction", "science"]),
            favorite_categories: tags(&["Fiction"]),
        },
        PatronDetails {
            first_name: "Helen".to_string(),
            last_name: "Whitaker".to_string(),
            email: "helen.whitaker@example.org".to_string(),
            age: 47,
            interests: tags(&["history"]),
            favorite_categories: tags(&["Classic Literature"]),
        },
    ];

    readers
        .into_iter()
        .map(|details| {
            library
                .register_patron(details)
                .map(|patron| patron.id().clone())
        })
        .collect()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
