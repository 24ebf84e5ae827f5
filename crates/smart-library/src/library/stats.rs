use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::catalog::CatalogItem;
use super::patron::Patron;
use super::service::OverdueNotice;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySummary {
    pub total_items: usize,
    pub total_patrons: usize,
    pub on_loan: usize,
    pub available: usize,
    pub total_checkouts: u64,
    pub overdue_loans: usize,
    pub total_penalties: u64,
    pub category_count: usize,
}

/// Circulation figures for one category; uncategorised items are grouped under `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Option<String>,
    pub items: usize,
    pub checkouts: u64,
    pub average_checkouts: f64,
    pub on_loan: usize,
}

pub(crate) fn summarize(
    items: &[CatalogItem],
    patrons: &[Patron],
    overdue: &[OverdueNotice],
) -> LibrarySummary {
    let on_loan = items.iter().filter(|item| item.is_on_loan()).count();
    let categories: BTreeSet<Option<&str>> = items.iter().map(CatalogItem::category).collect();

    LibrarySummary {
        total_items: items.len(),
        total_patrons: patrons.len(),
        on_loan,
        available: items.len() - on_loan,
        total_checkouts: items
            .iter()
            .map(|item| u64::from(item.checkout_count()))
            .sum(),
        overdue_loans: overdue.len(),
        total_penalties: overdue.iter().map(|notice| notice.penalty).sum(),
        category_count: categories.len(),
    }
}

pub(crate) fn category_breakdown(items: &[CatalogItem]) -> Vec<CategoryBreakdown> {
    let mut groups: BTreeMap<Option<&str>, Vec<&CatalogItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category()).or_default().push(item);
    }

    let mut rows: Vec<CategoryBreakdown> = groups
        .into_iter()
        .map(|(category, members)| {
            let checkouts: u64 = members
                .iter()
                .map(|item| u64::from(item.checkout_count()))
                .sum();
            CategoryBreakdown {
                category: category.map(str::to_string),
                items: members.len(),
                checkouts,
                average_checkouts: checkouts as f64 / members.len() as f64,
                on_loan: members.iter().filter(|item| item.is_on_loan()).count(),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.checkouts.cmp(&a.checkouts));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::catalog::{ItemDraft, ItemKind};
    use chrono::NaiveDate;

    fn item(key: &str, category: Option<&str>, count: u32) -> CatalogItem {
        CatalogItem::new(ItemDraft {
            key: key.to_string(),
            title: key.to_uppercase(),
            creator: "Someone".to_string(),
            published_on: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            category: category.map(str::to_string),
            kind: ItemKind::Thesis {
                institution: None,
                department: None,
                advisor: None,
                degree_level: Some("PhD".to_string()),
            },
        })
        .with_checkout_count(count)
    }

    #[test]
    fn breakdown_groups_and_orders_by_checkouts() {
        let items = vec![
            item("a", Some("Art"), 2),
            item("b", Some("Law"), 10),
            item("c", Some("Art"), 4),
            item("d", None, 1),
        ];
        let rows = category_breakdown(&items);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].category.as_deref(), Some("Law"));
        assert_eq!(rows[1].category.as_deref(), Some("Art"));
        assert_eq!(rows[1].items, 2);
        assert_eq!(rows[1].checkouts, 6);
        assert!((rows[1].average_checkouts - 3.0).abs() < f64::EPSILON);
        assert_eq!(rows[2].category, None);
    }

    #[test]
    fn summary_totals_catalog_and_penalties() {
        let items = vec![item("a", Some("Art"), 2), item("b", None, 5)];
        let overdue = vec![OverdueNotice {
            patron_id: crate::library::PatronId("patron-x".to_string()),
            patron_name: "X".to_string(),
            item_key: "a".to_string(),
            item_title: "A".to_string(),
            overdue_days: 4,
            penalty: 12,
        }];
        let summary = summarize(&items, &[], &overdue);

        assert_eq!(summary.total_items, 2);
        assert_eq!(summary.available, 2);
        assert_eq!(summary.total_checkouts, 7);
        assert_eq!(summary.overdue_loans, 1);
        assert_eq!(summary.total_penalties, 12);
        assert_eq!(summary.category_count, 2);
    }
}
