use std::collections::HashSet;

use chrono::Datelike;
use tracing::debug;

use super::profile::ReaderProfile;
use crate::library::CatalogItem;

/// Publication window, in calendar years, for readers under eighteen.
const YOUNG_READER_WINDOW_YEARS: i32 = 5;
const YOUNG_READER_AGE: u32 = 18;
const MATURE_READER_AGE: u32 = 40;

/// One stage of the recommendation chain. Stages receive the previous stage's
/// output and may reorder, shrink or pad it.
pub trait RecommendationFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        items: Vec<CatalogItem>,
        profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem>;
}

/// Top up `kept` from `input`, in input order, until it reaches `target` or the
/// input runs out.
fn pad(mut kept: Vec<CatalogItem>, input: &[CatalogItem], target: usize) -> Vec<CatalogItem> {
    if kept.len() >= target {
        return kept;
    }

    let included: HashSet<String> = kept.iter().map(|item| item.key().to_string()).collect();
    let missing = target - kept.len();
    kept.extend(
        input
            .iter()
            .filter(|item| !included.contains(item.key()))
            .take(missing)
            .cloned(),
    );
    kept
}

/// Stable sort, most borrowed first.
fn by_checkouts_desc(items: &mut [CatalogItem]) {
    items.sort_by(|a, b| b.checkout_count().cmp(&a.checkout_count()));
}

/// Keeps read or favourite categories.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryFilter;

impl RecommendationFilter for CategoryFilter {
    fn name(&self) -> &'static str {
        "category"
    }

    fn apply(
        &self,
        items: Vec<CatalogItem>,
        profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem> {
        let kept = items
            .iter()
            .filter(|item| item.category().is_some_and(|c| profile.prefers_category(c)))
            .cloned()
            .collect();
        pad(kept, &items, target)
    }
}

/// Keeps items whose category or title mentions an interest tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct InterestFilter;

impl RecommendationFilter for InterestFilter {
    fn name(&self) -> &'static str {
        "interest"
    }

    fn apply(
        &self,
        items: Vec<CatalogItem>,
        profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem> {
        if profile.interests.is_empty() {
            return items;
        }

        let kept = items
            .iter()
            .filter(|item| {
                item.category().is_some_and(|c| profile.interested_in(c))
                    || profile.interested_in(item.title())
            })
            .cloned()
            .collect();
        pad(kept, &items, target)
    }
}

/// Drops anything already borrowed and moves familiar creators to the front.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryFilter;

impl RecommendationFilter for HistoryFilter {
    fn name(&self) -> &'static str {
        "history"
    }

    fn apply(
        &self,
        items: Vec<CatalogItem>,
        profile: &ReaderProfile,
        _target: usize,
    ) -> Vec<CatalogItem> {
        let (familiar, unfamiliar): (Vec<_>, Vec<_>) = items
            .into_iter()
            .filter(|item| !profile.has_borrowed(item.key()))
            .partition(|item| profile.has_read_creator(item.creator()));

        familiar.into_iter().chain(unfamiliar).collect()
    }
}

/// Age-banded ordering with a full fallback when the band leaves too few items.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeFilter;

impl RecommendationFilter for AgeFilter {
    fn name(&self) -> &'static str {
        "age"
    }

    fn apply(
        &self,
        items: Vec<CatalogItem>,
        profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem> {
        let banded = if profile.age < YOUNG_READER_AGE {
            let earliest_year = profile.today.year() - YOUNG_READER_WINDOW_YEARS;
            let mut recent: Vec<CatalogItem> = items
                .iter()
                .filter(|item| item.published_on().year() >= earliest_year)
                .cloned()
                .collect();
            by_checkouts_desc(&mut recent);
            recent
        } else if profile.age < MATURE_READER_AGE {
            return items;
        } else {
            let mut oldest_first = items.clone();
            oldest_first.sort_by_key(|item| item.published_on());
            oldest_first
        };

        if banded.len() < target {
            debug!(
                kept = banded.len(),
                target, "age band too narrow, using unfiltered input"
            );
            return items;
        }
        banded
    }
}

/// Two thirds proven favourites, one third discovery picks just below them.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopularityFilter;

impl RecommendationFilter for PopularityFilter {
    fn name(&self) -> &'static str {
        "popularity"
    }

    fn apply(
        &self,
        mut items: Vec<CatalogItem>,
        _profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem> {
        by_checkouts_desc(&mut items);
        let discovery = target / 3;
        let popular = discovery * 2 + (target % 3) * 2 / 3;
        items.truncate(popular.saturating_add(discovery));
        items
    }
}

/// Ordered list of stages; the result is always cut to the target size.
pub struct FilterChain {
    stages: Vec<Box<dyn RecommendationFilter>>,
}

impl FilterChain {
    pub fn new(stages: Vec<Box<dyn RecommendationFilter>>) -> Self {
        Self { stages }
    }

    /// Category, interest, history, age, popularity.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(CategoryFilter),
            Box::new(InterestFilter),
            Box::new(HistoryFilter),
            Box::new(AgeFilter),
            Box::new(PopularityFilter),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(
        &self,
        candidates: Vec<CatalogItem>,
        profile: &ReaderProfile,
        target: usize,
    ) -> Vec<CatalogItem> {
        let mut items = self
            .stages
            .iter()
            .fold(candidates, |items, stage| {
                let before = items.len();
                let after = stage.apply(items, profile, target);
                debug!(stage = stage.name(), before, after = after.len(), "filter applied");
                after
            });
        items.truncate(target);
        items
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::standard()
    }
}
