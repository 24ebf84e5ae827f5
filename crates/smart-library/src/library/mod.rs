//! Catalog, patrons, and the loan/return state machine.

pub mod catalog;
pub mod memory;
pub mod patron;
pub mod repository;
pub mod router;
pub mod search;
pub mod service;
pub mod stats;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogItem, ItemDraft, ItemKind};
pub use memory::{InMemoryAuditLog, InMemoryCatalogRepository, InMemoryPatronRepository};
pub use patron::{LoanRecord, Patron, PatronDetails, PatronId};
pub use repository::{
    AuditEvent, AuditEventKind, AuditSink, CatalogRepository, CirculationGate, PatronRepository,
    RepositoryError,
};
pub use router::{failure_response, library_router, LoanRequest};
pub use search::CatalogQuery;
pub use service::{CirculationError, FailureKind, LibraryService, OverdueNotice};
pub use stats::{CategoryBreakdown, LibrarySummary};
