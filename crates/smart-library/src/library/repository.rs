use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::CatalogItem;
use super::patron::{Patron, PatronId};

/// Storage abstraction for registered patrons.
pub trait PatronRepository: Send + Sync {
    fn insert(&self, patron: Patron) -> Result<Patron, RepositoryError>;
    fn update(&self, patron: Patron) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError>;
    fn list(&self) -> Result<Vec<Patron>, RepositoryError>;
    fn remove(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError>;
}

/// Storage abstraction for the catalog, keyed by item key.
pub trait CatalogRepository: Send + Sync {
    fn insert(&self, item: CatalogItem) -> Result<CatalogItem, RepositoryError>;
    fn update(&self, item: CatalogItem) -> Result<(), RepositoryError>;
    fn fetch(&self, key: &str) -> Result<Option<CatalogItem>, RepositoryError>;
    fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError>;
    fn remove(&self, key: &str) -> Result<Option<CatalogItem>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget sink for successful mutations.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    ItemAdded,
    ItemUpdated,
    ItemRemoved,
    PatronRegistered,
    PatronUpdated,
    PatronRemoved,
    CheckedOut,
    Returned,
}

impl AuditEventKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ItemAdded => "ITEM_ADDED",
            Self::ItemUpdated => "ITEM_UPDATED",
            Self::ItemRemoved => "ITEM_REMOVED",
            Self::PatronRegistered => "PATRON_REGISTERED",
            Self::PatronUpdated => "PATRON_UPDATED",
            Self::PatronRemoved => "PATRON_REMOVED",
            Self::CheckedOut => "CHECKED_OUT",
            Self::Returned => "RETURNED",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub kind: AuditEventKind,
    pub description: String,
    pub recorded_at: DateTime<Utc>,
}

/// Process-wide coordination point for catalog and patron state. Mutations take the
/// exclusive side for their whole read-check-write unit; readers take the shared side.
#[derive(Debug, Default)]
pub struct CirculationGate {
    lock: RwLock<()>,
}

impl CirculationGate {
    pub fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().unwrap_or_else(PoisonError::into_inner)
    }
}
