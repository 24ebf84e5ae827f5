use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Variant payload of a circulating item. Due period and penalty rate are derived
/// from the variant and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Book {
        page_count: u32,
        #[serde(default)]
        publisher: Option<String>,
        #[serde(default)]
        language: Option<String>,
    },
    Periodical {
        issue_number: u32,
        #[serde(default)]
        frequency: Option<String>,
        #[serde(default)]
        series_id: Option<String>,
    },
    Thesis {
        #[serde(default)]
        institution: Option<String>,
        #[serde(default)]
        department: Option<String>,
        #[serde(default)]
        advisor: Option<String>,
        #[serde(default)]
        degree_level: Option<String>,
    },
}

impl ItemKind {
    pub const fn loan_period_days(&self) -> u32 {
        match self {
            ItemKind::Book { .. } => 14,
            ItemKind::Periodical { .. } => 7,
            ItemKind::Thesis { .. } => 21,
        }
    }

    /// Penalty in whole currency units per overdue day.
    pub const fn penalty_per_day(&self) -> u64 {
        match self {
            ItemKind::Book { .. } => 2,
            ItemKind::Periodical { .. } => 1,
            ItemKind::Thesis { .. } => 3,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            ItemKind::Book { .. } => "Book",
            ItemKind::Periodical { .. } => "Periodical",
            ItemKind::Thesis { .. } => "Thesis",
        }
    }
}

/// Descriptive fields supplied when cataloguing or revising an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub key: String,
    pub title: String,
    pub creator: String,
    pub published_on: NaiveDate,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl ItemDraft {
    pub(crate) fn missing_field(&self) -> Option<&'static str> {
        if self.key.trim().is_empty() {
            Some("key")
        } else if self.title.trim().is_empty() {
            Some("title")
        } else if self.creator.trim().is_empty() {
            Some("creator")
        } else {
            None
        }
    }
}

/// A catalogued item. Loan state and checkout count only change through
/// [`CatalogItem::check_out`] and [`CatalogItem::check_in`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    key: String,
    title: String,
    creator: String,
    published_on: NaiveDate,
    category: Option<String>,
    #[serde(flatten)]
    kind: ItemKind,
    on_loan_since: Option<DateTime<Utc>>,
    checkout_count: u32,
}

impl CatalogItem {
    pub fn new(draft: ItemDraft) -> Self {
        let ItemDraft {
            key,
            title,
            creator,
            published_on,
            category,
            kind,
        } = draft;

        Self {
            key,
            title,
            creator,
            published_on,
            category,
            kind,
            on_loan_since: None,
            checkout_count: 0,
        }
    }

    /// Seed the cumulative checkout count, e.g. when importing an existing catalog.
    pub fn with_checkout_count(mut self, count: u32) -> Self {
        self.checkout_count = self.checkout_count.max(count);
        self
    }

    /// Replace descriptive fields and variant while keeping key, loan state and
    /// checkout count.
    pub(crate) fn revise(&mut self, draft: ItemDraft) {
        self.title = draft.title;
        self.creator = draft.creator;
        self.published_on = draft.published_on;
        self.category = draft.category;
        self.kind = draft.kind;
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn published_on(&self) -> NaiveDate {
        self.published_on
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    pub fn is_on_loan(&self) -> bool {
        self.on_loan_since.is_some()
    }

    pub fn on_loan_since(&self) -> Option<DateTime<Utc>> {
        self.on_loan_since
    }

    pub fn checkout_count(&self) -> u32 {
        self.checkout_count
    }

    pub fn loan_period_days(&self) -> u32 {
        self.kind.loan_period_days()
    }

    pub fn penalty_per_day(&self) -> u64 {
        self.kind.penalty_per_day()
    }

    pub fn penalty_for(&self, overdue_days: u32) -> u64 {
        u64::from(overdue_days) * self.penalty_per_day()
    }

    pub(crate) fn check_out(&mut self, at: DateTime<Utc>) {
        self.on_loan_since = Some(at);
        self.checkout_count = self.checkout_count.saturating_add(1);
    }

    pub(crate) fn check_in(&mut self) {
        self.on_loan_since = None;
    }

    /// Days past the due date of the current loan; zero when not on loan.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> u32 {
        self.on_loan_since
            .map(|since| days_past(due_at(since, self.loan_period_days()), now))
            .unwrap_or(0)
    }

    /// Age of the publication in fractional years, negative for future dates.
    pub fn age_in_years(&self, today: NaiveDate) -> f64 {
        (today - self.published_on).num_days() as f64 / 365.0
    }

    /// Case-insensitive substring match over title, creator, key and category.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        contains_folded(&self.title, &needle)
            || contains_folded(&self.creator, &needle)
            || contains_folded(&self.key, &needle)
            || self
                .category
                .as_deref()
                .map(|category| contains_folded(category, &needle))
                .unwrap_or(false)
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} ({}, {})",
            self.kind.label(),
            self.title,
            self.creator,
            self.key,
            if self.is_on_loan() { "on loan" } else { "available" }
        )
    }
}

pub(crate) fn due_at(checked_out_at: DateTime<Utc>, loan_period_days: u32) -> DateTime<Utc> {
    checked_out_at + Duration::days(i64::from(loan_period_days))
}

/// Whole days elapsed past `due`, counting a started day as a full day.
pub(crate) fn days_past(due: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    if now <= due {
        return 0;
    }

    let elapsed = now - due;
    let whole = elapsed.num_days();
    let started = if elapsed > Duration::days(whole) {
        whole + 1
    } else {
        whole
    };
    u32::try_from(started).unwrap_or(u32::MAX)
}

/// `haystack` contains `needle`, where `needle` is already lowercased.
pub(crate) fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn book() -> CatalogItem {
        CatalogItem::new(ItemDraft {
            key: "978-0-00".to_string(),
            title: "Orbital Mechanics".to_string(),
            creator: "R. Vance".to_string(),
            published_on: NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
            category: Some("Science".to_string()),
            kind: ItemKind::Book {
                page_count: 320,
                publisher: None,
                language: Some("en".to_string()),
            },
        })
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn variant_rules_are_fixed() {
        let periodical = ItemKind::Periodical {
            issue_number: 4,
            frequency: None,
            series_id: None,
        };
        let thesis = ItemKind::Thesis {
            institution: None,
            department: None,
            advisor: None,
            degree_level: None,
        };
        assert_eq!(book().loan_period_days(), 14);
        assert_eq!(book().penalty_per_day(), 2);
        assert_eq!(periodical.loan_period_days(), 7);
        assert_eq!(periodical.penalty_per_day(), 1);
        assert_eq!(thesis.loan_period_days(), 21);
        assert_eq!(thesis.penalty_per_day(), 3);
    }

    #[test]
    fn checkout_and_return_update_loan_state() {
        let mut item = book();
        assert!(!item.is_on_loan());
        assert_eq!(item.on_loan_since(), None);

        item.check_out(at(1, 9));
        assert!(item.is_on_loan());
        assert_eq!(item.on_loan_since(), Some(at(1, 9)));
        assert_eq!(item.checkout_count(), 1);

        item.check_in();
        assert!(!item.is_on_loan());
        assert_eq!(item.on_loan_since(), None);
        assert_eq!(item.checkout_count(), 1, "returns never reduce the count");
    }

    #[test]
    fn days_overdue_counts_started_days() {
        let mut item = book();
        assert_eq!(item.days_overdue(at(20, 9)), 0);

        item.check_out(at(1, 9));
        assert_eq!(item.days_overdue(at(15, 9)), 0, "due instant is not late");
        assert_eq!(item.days_overdue(at(15, 10)), 1);
        assert_eq!(item.days_overdue(at(18, 9)), 3);
        assert_eq!(item.penalty_for(item.days_overdue(at(18, 9))), 6);
    }

    #[test]
    fn revise_keeps_loan_state_and_count() {
        let mut item = book().with_checkout_count(7);
        item.check_out(at(2, 8));
        let mut draft = ItemDraft {
            key: item.key().to_string(),
            title: "Orbital Mechanics, 2nd ed.".to_string(),
            creator: "R. Vance".to_string(),
            published_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            category: None,
            kind: ItemKind::Thesis {
                institution: None,
                department: None,
                advisor: None,
                degree_level: None,
            },
        };
        draft.category = Some("Physics".to_string());
        item.revise(draft);

        assert_eq!(item.title(), "Orbital Mechanics, 2nd ed.");
        assert_eq!(item.category(), Some("Physics"));
        assert_eq!(item.checkout_count(), 8);
        assert!(item.is_on_loan());
        assert_eq!(item.penalty_per_day(), 3);
    }

    #[test]
    fn text_search_is_case_insensitive() {
        let item = book();
        assert!(item.matches_text("orbital"));
        assert!(item.matches_text("VANCE"));
        assert!(item.matches_text("scien"));
        assert!(item.matches_text("978"));
        assert!(!item.matches_text("poetry"));
    }

    #[test]
    fn serializes_variant_inline() {
        let value = serde_json::to_value(book()).unwrap();
        assert_eq!(value["type"], "book");
        assert_eq!(value["page_count"], 320);
        assert_eq!(value["checkout_count"], 0);
    }
}
