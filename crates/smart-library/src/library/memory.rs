use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use super::catalog::CatalogItem;
use super::patron::{Patron, PatronId};
use super::repository::{
    AuditEvent, AuditEventKind, AuditSink, CatalogRepository, PatronRepository, RepositoryError,
};

/// Map that remembers insertion order so listings are stable.
#[derive(Debug)]
struct OrderedRecords<K, V> {
    order: Vec<K>,
    records: HashMap<K, V>,
}

impl<K, V> Default for OrderedRecords<K, V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }
}

impl<K, V> OrderedRecords<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    fn insert(&mut self, key: K, value: V) -> Result<(), RepositoryError> {
        if self.records.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        self.order.push(key.clone());
        self.records.insert(key, value);
        Ok(())
    }

    fn update(&mut self, key: &K, value: V) -> Result<(), RepositoryError> {
        match self.records.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.records.get(key).cloned()
    }

    fn values(&self) -> Vec<V> {
        self.order
            .iter()
            .filter_map(|key| self.records.get(key).cloned())
            .collect()
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.records.remove(key)?;
        self.order.retain(|existing| existing != key);
        Some(removed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryPatronRepository {
    patrons: Arc<Mutex<OrderedRecords<PatronId, Patron>>>,
}

impl PatronRepository for InMemoryPatronRepository {
    fn insert(&self, patron: Patron) -> Result<Patron, RepositoryError> {
        lock(&self.patrons).insert(patron.id().clone(), patron.clone())?;
        Ok(patron)
    }

    fn update(&self, patron: Patron) -> Result<(), RepositoryError> {
        let id = patron.id().clone();
        lock(&self.patrons).update(&id, patron)
    }

    fn fetch(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError> {
        Ok(lock(&self.patrons).get(id))
    }

    fn list(&self) -> Result<Vec<Patron>, RepositoryError> {
        Ok(lock(&self.patrons).values())
    }

    fn remove(&self, id: &PatronId) -> Result<Option<Patron>, RepositoryError> {
        Ok(lock(&self.patrons).remove(id))
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalogRepository {
    items: Arc<Mutex<OrderedRecords<String, CatalogItem>>>,
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn insert(&self, item: CatalogItem) -> Result<CatalogItem, RepositoryError> {
        lock(&self.items).insert(item.key().to_string(), item.clone())?;
        Ok(item)
    }

    fn update(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let key = item.key().to_string();
        lock(&self.items).update(&key, item)
    }

    fn fetch(&self, key: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        Ok(lock(&self.items).get(&key.to_string()))
    }

    fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        Ok(lock(&self.items).values())
    }

    fn remove(&self, key: &str) -> Result<Option<CatalogItem>, RepositoryError> {
        Ok(lock(&self.items).remove(&key.to_string()))
    }
}

/// Append-only audit trail kept in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAuditLog {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    pub fn events(&self) -> Vec<AuditEvent> {
        lock(&self.events).clone()
    }

    /// Events ordered newest first.
    pub fn history(&self) -> Vec<AuditEvent> {
        let mut events = self.events();
        events.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        events
    }

    pub fn on_date(&self, date: NaiveDate) -> Vec<AuditEvent> {
        lock(&self.events)
            .iter()
            .filter(|event| event.recorded_at.date_naive() == date)
            .cloned()
            .collect()
    }

    pub fn daily_counts(&self, date: NaiveDate) -> BTreeMap<AuditEventKind, usize> {
        let mut counts = BTreeMap::new();
        for event in self.on_date(date) {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: AuditEvent) {
        lock(&self.events).push(event);
    }
}
