use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::filters::FilterChain;
use super::profile::ReaderProfile;
use super::scoring::{score_item, ScoreComponent};
use crate::clock::Clock;
use crate::config::RecommendationConfig;
use crate::library::{
    CatalogItem, CatalogRepository, CirculationGate, FailureKind, PatronId, PatronRepository,
    RepositoryError,
};

/// A ranked, explained suggestion. `reasons` mirrors the component reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub item: CatalogItem,
    pub score: f64,
    pub components: Vec<ScoreComponent>,
    pub reasons: Vec<String>,
}

/// Read-only recommendation pipeline over the lending stores.
pub struct RecommendationService<P, C> {
    patrons: Arc<P>,
    catalog: Arc<C>,
    clock: Arc<dyn Clock>,
    gate: Arc<CirculationGate>,
    chain: Arc<FilterChain>,
    defaults: RecommendationConfig,
}

impl<P, C> RecommendationService<P, C>
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    pub fn new(
        patrons: Arc<P>,
        catalog: Arc<C>,
        clock: Arc<dyn Clock>,
        gate: Arc<CirculationGate>,
    ) -> Self {
        Self {
            patrons,
            catalog,
            clock,
            gate,
            chain: Arc::new(FilterChain::standard()),
            defaults: RecommendationConfig::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: RecommendationConfig) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_chain(mut self, chain: FilterChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    pub fn defaults(&self) -> RecommendationConfig {
        self.defaults
    }

    /// Up to `count` available items for the patron, best score first. Equal scores
    /// keep the order the filter chain produced.
    pub fn recommend(
        &self,
        patron_id: &PatronId,
        count: usize,
    ) -> Result<Vec<Recommendation>, RecommendationError> {
        let _unit = self.gate.shared();
        let patron = self
            .patrons
            .fetch(patron_id)?
            .ok_or_else(|| RecommendationError::PatronNotFound(patron_id.clone()))?;

        let catalog = self.catalog.list()?;
        let profile = ReaderProfile::build(&patron, &catalog, self.clock.today());
        let candidates: Vec<CatalogItem> = catalog
            .into_iter()
            .filter(|item| !item.is_on_loan())
            .collect();
        debug!(patron = %patron_id, candidates = candidates.len(), "running filter chain");

        let mut scored: Vec<(f64, CatalogItem, Vec<ScoreComponent>)> = self
            .chain
            .run(candidates, &profile, count)
            .into_iter()
            .map(|item| {
                let (score, components) = score_item(&item, &profile);
                (score, item, components)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let recommendations: Vec<Recommendation> = scored
            .into_iter()
            .enumerate()
            .map(|(index, (score, item, components))| Recommendation {
                rank: index + 1,
                reasons: components
                    .iter()
                    .map(|component| component.reason.clone())
                    .collect(),
                item,
                score,
                components,
            })
            .collect();

        info!(
            patron = %patron_id,
            returned = recommendations.len(),
            "recommendations generated"
        );
        Ok(recommendations)
    }

    /// Available items sharing the reference item's category or creator.
    pub fn similar_items(
        &self,
        item_key: &str,
        count: usize,
    ) -> Result<Vec<CatalogItem>, RecommendationError> {
        let _unit = self.gate.shared();
        let reference = self
            .catalog
            .fetch(item_key)?
            .ok_or_else(|| RecommendationError::ItemNotFound(item_key.to_string()))?;

        let similar = self.catalog.list()?.into_iter().filter(|item| {
            item.key() != reference.key()
                && !item.is_on_loan()
                && ((item.category().is_some() && item.category() == reference.category())
                    || item.creator() == reference.creator())
        });
        Ok(most_borrowed(similar.collect(), count))
    }

    /// The whole catalog, on loan or not, by cumulative checkouts.
    pub fn trending(&self, count: usize) -> Result<Vec<CatalogItem>, RecommendationError> {
        let _unit = self.gate.shared();
        Ok(most_borrowed(self.catalog.list()?, count))
    }

    pub fn category_recommendations(
        &self,
        category: &str,
        count: usize,
    ) -> Result<Vec<CatalogItem>, RecommendationError> {
        let _unit = self.gate.shared();
        let wanted = category.to_lowercase();
        let matching = self.catalog.list()?.into_iter().filter(|item| {
            !item.is_on_loan()
                && item
                    .category()
                    .is_some_and(|own| own.to_lowercase() == wanted)
        });
        Ok(most_borrowed(matching.collect(), count))
    }
}

fn most_borrowed(mut items: Vec<CatalogItem>, count: usize) -> Vec<CatalogItem> {
    items.sort_by(|a, b| b.checkout_count().cmp(&a.checkout_count()));
    items.truncate(count);
    items
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendationError {
    #[error("patron {0} not found")]
    PatronNotFound(PatronId),
    #[error("catalog item {0} not found")]
    ItemNotFound(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RecommendationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RecommendationError::PatronNotFound(_) | RecommendationError::ItemNotFound(_) => {
                FailureKind::NotFound
            }
            RecommendationError::Repository(RepositoryError::NotFound) => FailureKind::NotFound,
            RecommendationError::Repository(RepositoryError::Conflict) => {
                FailureKind::ConstraintViolation
            }
            RecommendationError::Repository(RepositoryError::Unavailable(_)) => {
                FailureKind::Storage
            }
        }
    }
}
