use serde::{Deserialize, Serialize};

use super::profile::ReaderProfile;
use crate::library::CatalogItem;

const POPULARITY_DIVISOR: f64 = 10.0;
const VERY_POPULAR_CHECKOUTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    CategoryAffinity,
    InterestAffinity,
    Popularity,
    CreatorFamiliarity,
    Recency,
}

impl ScoreFactor {
    /// Most points the factor can contribute.
    pub const fn ceiling(self) -> f64 {
        match self {
            ScoreFactor::CategoryAffinity => 30.0,
            ScoreFactor::InterestAffinity => 25.0,
            ScoreFactor::Popularity => 20.0,
            ScoreFactor::CreatorFamiliarity => 15.0,
            ScoreFactor::Recency => 10.0,
        }
    }
}

/// A factor that fired, the points it awarded and the reason shown to the reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
    pub reason: String,
}

/// Score an item for a reader. Components appear in factor order and only when
/// they award points; the total is their sum.
pub(crate) fn score_item(item: &CatalogItem, profile: &ReaderProfile) -> (f64, Vec<ScoreComponent>) {
    let mut components = Vec::new();

    if let Some(category) = item.category() {
        if profile.read_categories.contains(category) {
            components.push(ScoreComponent {
                factor: ScoreFactor::CategoryAffinity,
                points: ScoreFactor::CategoryAffinity.ceiling(),
                reason: format!("you have read {category} before"),
            });
        }

        if profile.interested_in(category) {
            components.push(ScoreComponent {
                factor: ScoreFactor::InterestAffinity,
                points: ScoreFactor::InterestAffinity.ceiling(),
                reason: "matches your interests".to_string(),
            });
        }
    }

    let checkouts = item.checkout_count();
    let popularity =
        (f64::from(checkouts) / POPULARITY_DIVISOR).min(ScoreFactor::Popularity.ceiling());
    if popularity > 0.0 {
        let reason = if checkouts > VERY_POPULAR_CHECKOUTS {
            format!("very popular ({checkouts} checkouts)")
        } else {
            format!("borrowed {checkouts} time(s)")
        };
        components.push(ScoreComponent {
            factor: ScoreFactor::Popularity,
            points: popularity,
            reason,
        });
    }

    if profile.has_read_creator(item.creator()) {
        components.push(ScoreComponent {
            factor: ScoreFactor::CreatorFamiliarity,
            points: ScoreFactor::CreatorFamiliarity.ceiling(),
            reason: format!("another work by {}", item.creator()),
        });
    }

    let age_years = item.age_in_years(profile.today);
    if age_years < 1.0 {
        components.push(ScoreComponent {
            factor: ScoreFactor::Recency,
            points: ScoreFactor::Recency.ceiling(),
            reason: "new release".to_string(),
        });
    } else if age_years < 3.0 {
        components.push(ScoreComponent {
            factor: ScoreFactor::Recency,
            points: 5.0,
            reason: "recent publication".to_string(),
        });
    }

    let total = components.iter().map(|component| component.points).sum();
    (total, components)
}
