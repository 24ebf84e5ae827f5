use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::{days_past, due_at};

/// Opaque identifier assigned at registration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatronId(pub String);

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PatronId {
    /// Identifier for the `sequence`-th registration, e.g. `patron-000042`.
    pub fn numbered(sequence: u64) -> Self {
        PatronId(format!("patron-{sequence:06}"))
    }
}

/// Profile fields a patron can register with or later edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatronDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub favorite_categories: BTreeSet<String>,
}

/// One checkout-to-return episode. Title, category and due period are captured at
/// checkout and never re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub item_key: String,
    pub item_title: String,
    pub category: Option<String>,
    pub checked_out_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub loan_period_days: u32,
}

impl LoanRecord {
    pub fn due_at(&self) -> DateTime<Utc> {
        due_at(self.checked_out_at, self.loan_period_days)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.returned_at.is_none() && now > self.due_at()
    }

    pub fn overdue_days(&self, now: DateTime<Utc>) -> u32 {
        if !self.is_overdue(now) {
            return 0;
        }
        days_past(self.due_at(), now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patron {
    id: PatronId,
    #[serde(flatten)]
    details: PatronDetails,
    registered_at: DateTime<Utc>,
    active_loans: Vec<LoanRecord>,
    loan_history: Vec<LoanRecord>,
}

impl Patron {
    pub fn register(id: PatronId, details: PatronDetails, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            registered_at,
            active_loans: Vec::new(),
            loan_history: Vec::new(),
        }
    }

    pub fn id(&self) -> &PatronId {
        &self.id
    }

    pub fn details(&self) -> &PatronDetails {
        &self.details
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.details.first_name, self.details.last_name)
            .trim()
            .to_string()
    }

    pub fn age(&self) -> u32 {
        self.details.age
    }

    pub fn interests(&self) -> &BTreeSet<String> {
        &self.details.interests
    }

    pub fn favorite_categories(&self) -> &BTreeSet<String> {
        &self.details.favorite_categories
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn active_loans(&self) -> &[LoanRecord] {
        &self.active_loans
    }

    pub fn loan_history(&self) -> &[LoanRecord] {
        &self.loan_history
    }

    pub(crate) fn replace_details(&mut self, details: PatronDetails) {
        self.details = details;
    }

    pub fn holds(&self, item_key: &str) -> bool {
        self.active_loans
            .iter()
            .any(|record| record.item_key == item_key)
    }

    /// Append an active loan unless the same item is already held.
    pub(crate) fn open_loan(&mut self, record: LoanRecord) -> bool {
        if self.holds(&record.item_key) {
            return false;
        }
        self.active_loans.push(record);
        true
    }

    /// Stamp the matching active loan and move it into the history.
    pub(crate) fn close_loan(
        &mut self,
        item_key: &str,
        returned_at: DateTime<Utc>,
    ) -> Option<&LoanRecord> {
        let position = self
            .active_loans
            .iter()
            .position(|record| record.item_key == item_key)?;
        let mut record = self.active_loans.remove(position);
        record.returned_at = Some(returned_at.max(record.checked_out_at));
        self.loan_history.push(record);
        self.loan_history.last()
    }

    /// Distinct categories drawn from returned loans.
    pub fn read_categories(&self) -> BTreeSet<String> {
        self.loan_history
            .iter()
            .filter_map(|record| record.category.clone())
            .filter(|category| !category.is_empty())
            .collect()
    }

    /// Every item key the patron has borrowed, active or returned.
    pub fn borrowed_keys(&self) -> BTreeSet<&str> {
        self.loan_history
            .iter()
            .chain(self.active_loans.iter())
            .map(|record| record.item_key.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn details() -> PatronDetails {
        PatronDetails {
            first_name: "Ada".to_string(),
            last_name: "Reyes".to_string(),
            email: "ada@example.org".to_string(),
            age: 31,
            interests: BTreeSet::from(["history".to_string()]),
            favorite_categories: BTreeSet::new(),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()
    }

    fn record(key: &str, category: Option<&str>, period: u32) -> LoanRecord {
        LoanRecord {
            item_key: key.to_string(),
            item_title: format!("Title {key}"),
            category: category.map(str::to_string),
            checked_out_at: start(),
            returned_at: None,
            loan_period_days: period,
        }
    }

    #[test]
    fn registration_keeps_the_assigned_id() {
        let patron = Patron::register(PatronId::numbered(42), details(), start());
        assert_eq!(patron.id().0, "patron-000042");
        assert_eq!(patron.full_name(), "Ada Reyes");
        assert_eq!(patron.registered_at(), start());
    }

    #[test]
    fn overdue_is_derived_from_due_period() {
        let loan = record("b-1", None, 7);
        assert!(!loan.is_overdue(start() + Duration::days(7)));
        assert_eq!(loan.overdue_days(start() + Duration::days(7)), 0);

        let late = start() + Duration::days(9);
        assert!(loan.is_overdue(late));
        assert_eq!(loan.overdue_days(late), 2);

        let mut returned = loan.clone();
        returned.returned_at = Some(late);
        assert!(!returned.is_overdue(late + Duration::days(30)));
        assert_eq!(returned.overdue_days(late + Duration::days(30)), 0);
    }

    #[test]
    fn a_partially_elapsed_day_counts_as_overdue() {
        let loan = record("b-1", None, 14);
        let just_late = start() + Duration::days(14) + Duration::minutes(5);
        assert!(loan.is_overdue(just_late));
        assert_eq!(loan.overdue_days(just_late), 1);
    }

    #[test]
    fn same_item_cannot_be_held_twice() {
        let mut patron = Patron::register(PatronId::numbered(1), details(), start());
        assert!(patron.open_loan(record("b-1", Some("History"), 14)));
        assert!(!patron.open_loan(record("b-1", Some("History"), 14)));
        assert_eq!(patron.active_loans().len(), 1);
    }

    #[test]
    fn closing_a_loan_moves_the_same_record() {
        let mut patron = Patron::register(PatronId::numbered(1), details(), start());
        patron.open_loan(record("b-1", Some("History"), 14));
        patron.open_loan(record("b-2", Some("Science"), 14));

        let returned_at = start() + Duration::days(3);
        let closed = patron
            .close_loan("b-1", returned_at)
            .expect("loan present")
            .clone();

        assert_eq!(closed.returned_at, Some(returned_at));
        assert_eq!(patron.active_loans().len(), 1);
        assert_eq!(patron.loan_history(), &[closed]);
        assert!(patron.close_loan("missing", returned_at).is_none());
    }

    #[test]
    fn read_categories_come_from_history_only() {
        let mut patron = Patron::register(PatronId::numbered(1), details(), start());
        patron.open_loan(record("b-1", Some("History"), 14));
        patron.open_loan(record("b-2", Some("History"), 14));
        patron.open_loan(record("b-3", None, 14));
        patron.open_loan(record("b-4", Some("Science"), 14));
        for key in ["b-1", "b-2", "b-3"] {
            patron.close_loan(key, start() + Duration::days(1));
        }

        let categories = patron.read_categories();
        assert_eq!(categories, BTreeSet::from(["History".to_string()]));
        assert_eq!(patron.borrowed_keys().len(), 4);
    }
}
