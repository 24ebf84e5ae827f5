//! Personalised recommendations: a fixed chain of narrowing stages followed by an
//! additive 0-100 scorer whose components double as the explanation shown to readers.

pub mod filters;
pub mod profile;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use filters::{
    AgeFilter, CategoryFilter, FilterChain, HistoryFilter, InterestFilter, PopularityFilter,
    RecommendationFilter,
};
pub use profile::ReaderProfile;
pub use router::{recommendation_failure_response, recommendation_router};
pub use scoring::{ScoreComponent, ScoreFactor};
pub use service::{Recommendation, RecommendationError, RecommendationService};
