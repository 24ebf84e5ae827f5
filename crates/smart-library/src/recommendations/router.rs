use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::service::{RecommendationError, RecommendationService};
use crate::library::{CatalogRepository, FailureKind, PatronId, PatronRepository};

type SharedRecommendations<P, C> = Arc<RecommendationService<P, C>>;

pub fn recommendation_router<P, C>(service: SharedRecommendations<P, C>) -> Router
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/recommendations/patrons/:patron_id",
            get(recommend_handler::<P, C>),
        )
        .route(
            "/api/v1/recommendations/similar/:key",
            get(similar_handler::<P, C>),
        )
        .route(
            "/api/v1/recommendations/trending",
            get(trending_handler::<P, C>),
        )
        .route(
            "/api/v1/recommendations/categories/:category",
            get(category_handler::<P, C>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CountParam {
    #[serde(default)]
    pub(crate) count: Option<usize>,
}

/// Map a recommendation failure to its HTTP status and a JSON error body.
pub fn recommendation_failure_response(error: RecommendationError) -> Response {
    let status = match error.kind() {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::CONFLICT,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn respond<T: Serialize>(outcome: Result<T, RecommendationError>) -> Response {
    match outcome {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(error) => recommendation_failure_response(error),
    }
}

pub(crate) async fn recommend_handler<P, C>(
    State(service): State<SharedRecommendations<P, C>>,
    Path(patron_id): Path<String>,
    Query(params): Query<CountParam>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    let count = params.count.unwrap_or(service.defaults().default_count);
    respond(service.recommend(&PatronId(patron_id), count))
}

pub(crate) async fn similar_handler<P, C>(
    State(service): State<SharedRecommendations<P, C>>,
    Path(key): Path<String>,
    Query(params): Query<CountParam>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    let count = params.count.unwrap_or(service.defaults().similar_count);
    respond(service.similar_items(&key, count))
}

pub(crate) async fn trending_handler<P, C>(
    State(service): State<SharedRecommendations<P, C>>,
    Query(params): Query<CountParam>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    let count = params.count.unwrap_or(service.defaults().trending_count);
    respond(service.trending(count))
}

pub(crate) async fn category_handler<P, C>(
    State(service): State<SharedRecommendations<P, C>>,
    Path(category): Path<String>,
    Query(params): Query<CountParam>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
{
    let count = params.count.unwrap_or(service.defaults().default_count);
    respond(service.category_recommendations(&category, count))
}
