use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::catalog::{CatalogItem, ItemDraft};
use super::patron::{LoanRecord, Patron, PatronDetails, PatronId};
use super::repository::{
    AuditEvent, AuditEventKind, AuditSink, CatalogRepository, CirculationGate, PatronRepository,
    RepositoryError,
};
use super::search::{self, CatalogQuery};
use super::stats::{self, CategoryBreakdown, LibrarySummary};
use crate::clock::Clock;
use crate::recommendations::RecommendationService;

/// One overdue active loan with its penalty at the item's current rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverdueNotice {
    pub patron_id: PatronId,
    pub patron_name: String,
    pub item_key: String,
    pub item_title: String,
    pub overdue_days: u32,
    pub penalty: u64,
}

/// Lending engine plus catalog and patron administration over one logical store.
pub struct LibraryService<P, C, A> {
    patrons: Arc<P>,
    catalog: Arc<C>,
    audit: Arc<A>,
    clock: Arc<dyn Clock>,
    gate: Arc<CirculationGate>,
    patron_sequence: AtomicU64,
}

impl<P, C, A> LibraryService<P, C, A>
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    pub fn new(patrons: Arc<P>, catalog: Arc<C>, audit: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            patrons,
            catalog,
            audit,
            clock,
            gate: Arc::new(CirculationGate::default()),
            patron_sequence: AtomicU64::new(1),
        }
    }

    /// Recommendation pipeline reading the same stores under the same gate.
    pub fn recommendations(&self) -> RecommendationService<P, C> {
        RecommendationService::new(
            self.patrons.clone(),
            self.catalog.clone(),
            self.clock.clone(),
            self.gate.clone(),
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Lend an available item to a patron.
    pub fn checkout(
        &self,
        patron_id: &PatronId,
        item_key: &str,
    ) -> Result<LoanRecord, CirculationError> {
        let outcome = {
            let _unit = self.gate.exclusive();
            self.checkout_locked(patron_id, item_key)
        };

        match &outcome {
            Ok(record) => {
                info!(patron = %patron_id, item = item_key, "item checked out");
                self.record(
                    AuditEventKind::CheckedOut,
                    format!("{patron_id} borrowed {}", record.item_title),
                );
            }
            Err(error) => warn!(patron = %patron_id, item = item_key, %error, "checkout rejected"),
        }
        outcome
    }

    fn checkout_locked(
        &self,
        patron_id: &PatronId,
        item_key: &str,
    ) -> Result<LoanRecord, CirculationError> {
        let mut patron = self.require_patron(patron_id)?;
        let original = self.require_item(item_key)?;

        if original.is_on_loan() {
            return Err(CirculationError::AlreadyOnLoan(item_key.to_string()));
        }
        if patron.holds(item_key) {
            return Err(CirculationError::AlreadyHeld {
                patron_id: patron_id.clone(),
                item_key: item_key.to_string(),
            });
        }

        let now = self.clock.now();
        let mut item = original.clone();
        item.check_out(now);

        let record = LoanRecord {
            item_key: item.key().to_string(),
            item_title: item.title().to_string(),
            category: item.category().map(str::to_string),
            checked_out_at: now,
            returned_at: None,
            loan_period_days: item.loan_period_days(),
        };
        patron.open_loan(record.clone());

        self.catalog.update(item)?;
        if let Err(error) = self.patrons.update(patron) {
            self.catalog.update(original)?;
            return Err(error.into());
        }

        Ok(record)
    }

    /// Take back an item the patron currently holds. Lateness never blocks a return.
    pub fn return_item(
        &self,
        patron_id: &PatronId,
        item_key: &str,
    ) -> Result<LoanRecord, CirculationError> {
        let outcome = {
            let _unit = self.gate.exclusive();
            self.return_locked(patron_id, item_key)
        };

        match &outcome {
            Ok(record) => {
                info!(patron = %patron_id, item = item_key, "item returned");
                self.record(
                    AuditEventKind::Returned,
                    format!("{patron_id} returned {}", record.item_title),
                );
            }
            Err(error) => warn!(patron = %patron_id, item = item_key, %error, "return rejected"),
        }
        outcome
    }

    fn return_locked(
        &self,
        patron_id: &PatronId,
        item_key: &str,
    ) -> Result<LoanRecord, CirculationError> {
        let mut patron = self.require_patron(patron_id)?;
        let original = self.require_item(item_key)?;

        if !original.is_on_loan() {
            return Err(CirculationError::NotOnLoan(item_key.to_string()));
        }

        let now = self.clock.now();
        let record = patron
            .close_loan(item_key, now)
            .cloned()
            .ok_or_else(|| CirculationError::NotHeldByPatron {
                patron_id: patron_id.clone(),
                item_key: item_key.to_string(),
            })?;

        let mut item = original.clone();
        item.check_in();

        self.catalog.update(item)?;
        if let Err(error) = self.patrons.update(patron) {
            self.catalog.update(original)?;
            return Err(error.into());
        }

        Ok(record)
    }

    /// Every overdue active loan across all patrons, in patron then loan order.
    pub fn overdue_report(&self) -> Result<Vec<OverdueNotice>, CirculationError> {
        let _unit = self.gate.shared();
        self.overdue_locked()
    }

    fn overdue_locked(&self) -> Result<Vec<OverdueNotice>, CirculationError> {
        let now = self.clock.now();
        let mut notices = Vec::new();

        for patron in self.patrons.list()? {
            for loan in patron.active_loans() {
                if !loan.is_overdue(now) {
                    continue;
                }
                let overdue_days = loan.overdue_days(now);
                let penalty = self
                    .catalog
                    .fetch(&loan.item_key)?
                    .map(|item| item.penalty_for(overdue_days))
                    .unwrap_or(0);

                notices.push(OverdueNotice {
                    patron_id: patron.id().clone(),
                    patron_name: patron.full_name(),
                    item_key: loan.item_key.clone(),
                    item_title: loan.item_title.clone(),
                    overdue_days,
                    penalty,
                });
            }
        }

        Ok(notices)
    }

    pub fn register_patron(&self, details: PatronDetails) -> Result<Patron, CirculationError> {
        let stored = {
            let _unit = self.gate.exclusive();
            let id = PatronId::numbered(self.patron_sequence.fetch_add(1, Ordering::Relaxed));
            let patron = Patron::register(id, details, self.clock.now());
            self.patrons.insert(patron)?
        };
        info!(patron = %stored.id(), "patron registered");
        self.record(
            AuditEventKind::PatronRegistered,
            format!("{} registered", stored.full_name()),
        );
        Ok(stored)
    }

    /// Replace profile fields; identity, loans and registration time are kept.
    pub fn update_patron(
        &self,
        patron_id: &PatronId,
        details: PatronDetails,
    ) -> Result<Patron, CirculationError> {
        let patron = {
            let _unit = self.gate.exclusive();
            let mut patron = self.require_patron(patron_id)?;
            patron.replace_details(details);
            self.patrons.update(patron.clone())?;
            patron
        };
        self.record(
            AuditEventKind::PatronUpdated,
            format!("{} updated", patron.full_name()),
        );
        Ok(patron)
    }

    /// Remove a patron. Refused while the patron still holds items.
    pub fn remove_patron(&self, patron_id: &PatronId) -> Result<Patron, CirculationError> {
        let removed = {
            let _unit = self.gate.exclusive();
            let patron = self.require_patron(patron_id)?;
            let count = patron.active_loans().len();
            if count > 0 {
                return Err(CirculationError::ActiveLoans {
                    patron_id: patron_id.clone(),
                    count,
                });
            }
            self.patrons
                .remove(patron_id)?
                .ok_or_else(|| CirculationError::PatronNotFound(patron_id.clone()))?
        };
        info!(patron = %patron_id, "patron removed");
        self.record(
            AuditEventKind::PatronRemoved,
            format!("{} removed", removed.full_name()),
        );
        Ok(removed)
    }

    pub fn patron(&self, patron_id: &PatronId) -> Result<Patron, CirculationError> {
        let _unit = self.gate.shared();
        self.require_patron(patron_id)
    }

    pub fn patrons(&self) -> Result<Vec<Patron>, CirculationError> {
        let _unit = self.gate.shared();
        Ok(self.patrons.list()?)
    }

    pub fn add_item(&self, draft: ItemDraft) -> Result<CatalogItem, CirculationError> {
        self.add_existing_item(CatalogItem::new(draft))
    }

    /// Catalogue an item that may already carry circulation history.
    pub fn add_existing_item(&self, item: CatalogItem) -> Result<CatalogItem, CirculationError> {
        validate_fields(item.key(), item.title(), item.creator())?;
        let key = item.key().to_string();
        let stored = {
            let _unit = self.gate.exclusive();
            self.catalog.insert(item).map_err(|error| match error {
                RepositoryError::Conflict => CirculationError::DuplicateItem(key),
                other => other.into(),
            })?
        };
        info!(item = stored.key(), "item catalogued");
        self.record(
            AuditEventKind::ItemAdded,
            format!("{} added", stored.title()),
        );
        Ok(stored)
    }

    /// Replace the descriptive fields of an item, keeping its circulation state.
    pub fn revise_item(
        &self,
        item_key: &str,
        draft: ItemDraft,
    ) -> Result<CatalogItem, CirculationError> {
        if draft.key != item_key {
            return Err(CirculationError::InvalidItem(format!(
                "key {} does not match {}",
                draft.key, item_key
            )));
        }
        if let Some(field) = draft.missing_field() {
            return Err(CirculationError::InvalidItem(format!("{field} is required")));
        }

        let item = {
            let _unit = self.gate.exclusive();
            let mut item = self.require_item(item_key)?;
            item.revise(draft);
            self.catalog.update(item.clone())?;
            item
        };
        self.record(
            AuditEventKind::ItemUpdated,
            format!("{} updated", item.title()),
        );
        Ok(item)
    }

    /// Remove an item from the catalog. Existing loan records keep their captured fields.
    pub fn remove_item(&self, item_key: &str) -> Result<CatalogItem, CirculationError> {
        let removed = {
            let _unit = self.gate.exclusive();
            self.catalog
                .remove(item_key)?
                .ok_or_else(|| CirculationError::ItemNotFound(item_key.to_string()))?
        };
        info!(item = item_key, "item removed");
        self.record(
            AuditEventKind::ItemRemoved,
            format!("{} removed", removed.title()),
        );
        Ok(removed)
    }

    pub fn item(&self, item_key: &str) -> Result<CatalogItem, CirculationError> {
        let _unit = self.gate.shared();
        self.require_item(item_key)
    }

    pub fn items(&self) -> Result<Vec<CatalogItem>, CirculationError> {
        let _unit = self.gate.shared();
        Ok(self.catalog.list()?)
    }

    /// Items matching every query, in catalog order.
    pub fn find_items(&self, queries: &[CatalogQuery]) -> Result<Vec<CatalogItem>, CirculationError> {
        Ok(queries
            .iter()
            .fold(self.items()?, |items, query| search::run(items, query)))
    }

    pub fn most_popular(&self, count: usize) -> Result<Vec<CatalogItem>, CirculationError> {
        Ok(search::most_popular(self.items()?, count))
    }

    /// Totals drawn from one consistent view of the catalog and patrons.
    pub fn summary(&self) -> Result<LibrarySummary, CirculationError> {
        let _unit = self.gate.shared();
        let items = self.catalog.list()?;
        let patrons = self.patrons.list()?;
        let overdue = self.overdue_locked()?;
        Ok(stats::summarize(&items, &patrons, &overdue))
    }

    pub fn category_breakdown(&self) -> Result<Vec<CategoryBreakdown>, CirculationError> {
        Ok(stats::category_breakdown(&self.items()?))
    }

    fn require_patron(&self, patron_id: &PatronId) -> Result<Patron, CirculationError> {
        self.patrons
            .fetch(patron_id)?
            .ok_or_else(|| CirculationError::PatronNotFound(patron_id.clone()))
    }

    fn require_item(&self, item_key: &str) -> Result<CatalogItem, CirculationError> {
        self.catalog
            .fetch(item_key)?
            .ok_or_else(|| CirculationError::ItemNotFound(item_key.to_string()))
    }

    fn record(&self, kind: AuditEventKind, description: String) {
        self.audit.record(AuditEvent {
            kind,
            description,
            recorded_at: self.clock.now(),
        });
    }
}

fn validate_fields(key: &str, title: &str, creator: &str) -> Result<(), CirculationError> {
    for (field, value) in [("key", key), ("title", title), ("creator", creator)] {
        if value.trim().is_empty() {
            return Err(CirculationError::InvalidItem(format!("{field} is required")));
        }
    }
    Ok(())
}

/// Broad classes of circulation failure, used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    InvalidState,
    ConstraintViolation,
    Validation,
    Storage,
}

/// Expected, non-exceptional outcomes of lending and administration requests.
#[derive(Debug, thiserror::Error)]
pub enum CirculationError {
    #[error("patron {0} not found")]
    PatronNotFound(PatronId),
    #[error("catalog item {0} not found")]
    ItemNotFound(String),
    #[error("catalog item {0} is already on loan")]
    AlreadyOnLoan(String),
    #[error("patron {patron_id} already holds catalog item {item_key}")]
    AlreadyHeld { patron_id: PatronId, item_key: String },
    #[error("catalog item {0} is not on loan")]
    NotOnLoan(String),
    #[error("catalog item {item_key} is not held by patron {patron_id}")]
    NotHeldByPatron { patron_id: PatronId, item_key: String },
    #[error("patron {patron_id} still has {count} active loan(s); return them first")]
    ActiveLoans { patron_id: PatronId, count: usize },
    #[error("catalog item {0} already exists")]
    DuplicateItem(String),
    #[error("invalid catalog item: {0}")]
    InvalidItem(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CirculationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CirculationError::PatronNotFound(_) | CirculationError::ItemNotFound(_) => {
                FailureKind::NotFound
            }
            CirculationError::AlreadyOnLoan(_)
            | CirculationError::AlreadyHeld { .. }
            | CirculationError::NotOnLoan(_)
            | CirculationError::NotHeldByPatron { .. } => FailureKind::InvalidState,
            CirculationError::ActiveLoans { .. } | CirculationError::DuplicateItem(_) => {
                FailureKind::ConstraintViolation
            }
            CirculationError::InvalidItem(_) => FailureKind::Validation,
            CirculationError::Repository(RepositoryError::NotFound) => FailureKind::NotFound,
            CirculationError::Repository(RepositoryError::Conflict) => {
                FailureKind::ConstraintViolation
            }
            CirculationError::Repository(RepositoryError::Unavailable(_)) => FailureKind::Storage,
        }
    }
}
