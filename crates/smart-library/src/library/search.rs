use serde::Deserialize;

use super::catalog::CatalogItem;

/// Catalog lookups offered to staff and patrons.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum CatalogQuery {
    /// Exact category, ignoring case.
    Category(String),
    /// Substring of the creator name, ignoring case.
    Creator(String),
    /// Substring of the title, ignoring case.
    Title(String),
    /// Substring of title, creator, key or category.
    Text(String),
    Available,
    OnLoan,
}

pub(crate) fn run(items: Vec<CatalogItem>, query: &CatalogQuery) -> Vec<CatalogItem> {
    items
        .into_iter()
        .filter(|item| matches(item, query))
        .collect()
}

fn matches(item: &CatalogItem, query: &CatalogQuery) -> bool {
    match query {
        CatalogQuery::Category(category) => item
            .category()
            .map(|own| own.to_lowercase() == category.to_lowercase())
            .unwrap_or(false),
        CatalogQuery::Creator(creator) => item
            .creator()
            .to_lowercase()
            .contains(&creator.to_lowercase()),
        CatalogQuery::Title(title) => item.title().to_lowercase().contains(&title.to_lowercase()),
        CatalogQuery::Text(text) => item.matches_text(text),
        CatalogQuery::Available => !item.is_on_loan(),
        CatalogQuery::OnLoan => item.is_on_loan(),
    }
}

/// Items ordered by descending checkout count; ties keep catalog order.
pub(crate) fn most_popular(mut items: Vec<CatalogItem>, count: usize) -> Vec<CatalogItem> {
    items.sort_by(|a, b| b.checkout_count().cmp(&a.checkout_count()));
    items.truncate(count);
    items
}
