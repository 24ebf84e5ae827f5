use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::ItemDraft;
use super::patron::{PatronDetails, PatronId};
use super::repository::{AuditSink, CatalogRepository, PatronRepository};
use super::search::CatalogQuery;
use super::service::{CirculationError, FailureKind, LibraryService};

type SharedLibrary<P, C, A> = Arc<LibraryService<P, C, A>>;

/// Router exposing catalog, patron, loan and statistics endpoints.
pub fn library_router<P, C, A>(service: SharedLibrary<P, C, A>) -> Router
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/items",
            get(list_items_handler::<P, C, A>).post(add_item_handler::<P, C, A>),
        )
        .route(
            "/api/v1/items/:key",
            get(item_handler::<P, C, A>)
                .put(revise_item_handler::<P, C, A>)
                .delete(remove_item_handler::<P, C, A>),
        )
        .route(
            "/api/v1/patrons",
            get(list_patrons_handler::<P, C, A>).post(register_patron_handler::<P, C, A>),
        )
        .route(
            "/api/v1/patrons/:patron_id",
            get(patron_handler::<P, C, A>)
                .put(update_patron_handler::<P, C, A>)
                .delete(remove_patron_handler::<P, C, A>),
        )
        .route(
            "/api/v1/patrons/:patron_id/history",
            get(patron_history_handler::<P, C, A>),
        )
        .route(
            "/api/v1/patrons/:patron_id/active-loans",
            get(patron_active_loans_handler::<P, C, A>),
        )
        .route(
            "/api/v1/patrons/:patron_id/categories",
            get(patron_categories_handler::<P, C, A>),
        )
        .route("/api/v1/loans/checkout", post(checkout_handler::<P, C, A>))
        .route("/api/v1/loans/return", post(return_handler::<P, C, A>))
        .route("/api/v1/loans/overdue", get(overdue_handler::<P, C, A>))
        .route("/api/v1/stats/summary", get(summary_handler::<P, C, A>))
        .route("/api/v1/stats/popular", get(popular_handler::<P, C, A>))
        .route(
            "/api/v1/stats/categories",
            get(category_breakdown_handler::<P, C, A>),
        )
        .with_state(service)
}

/// Map a circulation failure to its HTTP status and a JSON error body.
pub fn failure_response(error: CirculationError) -> Response {
    let status = match error.kind() {
        FailureKind::NotFound => StatusCode::NOT_FOUND,
        FailureKind::InvalidState | FailureKind::ConstraintViolation => StatusCode::CONFLICT,
        FailureKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, CirculationError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => failure_response(error),
    }
}

/// Optional listing filters; every supplied filter must match.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemFilter {
    #[serde(default)]
    pub(crate) q: Option<String>,
    #[serde(default)]
    pub(crate) category: Option<String>,
    #[serde(default)]
    pub(crate) creator: Option<String>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<ItemStatus>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ItemStatus {
    Available,
    OnLoan,
}

impl ItemFilter {
    fn queries(self) -> Vec<CatalogQuery> {
        let mut queries = Vec::new();
        if let Some(text) = self.q {
            queries.push(CatalogQuery::Text(text));
        }
        if let Some(category) = self.category {
            queries.push(CatalogQuery::Category(category));
        }
        if let Some(creator) = self.creator {
            queries.push(CatalogQuery::Creator(creator));
        }
        if let Some(title) = self.title {
            queries.push(CatalogQuery::Title(title));
        }
        match self.status {
            Some(ItemStatus::Available) => queries.push(CatalogQuery::Available),
            Some(ItemStatus::OnLoan) => queries.push(CatalogQuery::OnLoan),
            None => {}
        }
        queries
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoanRequest {
    pub patron_id: PatronId,
    pub item_key: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CountParam {
    #[serde(default)]
    pub(crate) count: Option<usize>,
}

pub(crate) async fn list_items_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Query(filter): Query<ItemFilter>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.find_items(&filter.queries()))
}

pub(crate) async fn add_item_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Json(draft): Json<ItemDraft>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::CREATED, service.add_item(draft))
}

pub(crate) async fn item_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(key): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.item(&key))
}

pub(crate) async fn revise_item_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(key): Path<String>,
    Json(draft): Json<ItemDraft>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.revise_item(&key, draft))
}

pub(crate) async fn remove_item_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(key): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.remove_item(&key))
}

pub(crate) async fn list_patrons_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.patrons())
}

pub(crate) async fn register_patron_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Json(details): Json<PatronDetails>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::CREATED, service.register_patron(details))
}

pub(crate) async fn patron_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.patron(&PatronId(patron_id)))
}

pub(crate) async fn update_patron_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
    Json(details): Json<PatronDetails>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.update_patron(&PatronId(patron_id), details),
    )
}

pub(crate) async fn remove_patron_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.remove_patron(&PatronId(patron_id)))
}

pub(crate) async fn patron_history_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    let outcome = service
        .patron(&PatronId(patron_id))
        .map(|patron| patron.loan_history().to_vec());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn patron_active_loans_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    let outcome = service
        .patron(&PatronId(patron_id))
        .map(|patron| patron.active_loans().to_vec());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn patron_categories_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Path(patron_id): Path<String>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    let outcome = service
        .patron(&PatronId(patron_id))
        .map(|patron| patron.read_categories());
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn checkout_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Json(request): Json<LoanRequest>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::CREATED,
        service.checkout(&request.patron_id, &request.item_key),
    )
}

pub(crate) async fn return_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Json(request): Json<LoanRequest>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.return_item(&request.patron_id, &request.item_key),
    )
}

pub(crate) async fn overdue_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.overdue_report())
}

pub(crate) async fn summary_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.summary())
}

pub(crate) async fn popular_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
    Query(params): Query<CountParam>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(
        StatusCode::OK,
        service.most_popular(params.count.unwrap_or(10)),
    )
}

pub(crate) async fn category_breakdown_handler<P, C, A>(
    State(service): State<SharedLibrary<P, C, A>>,
) -> Response
where
    P: PatronRepository + 'static,
    C: CatalogRepository + 'static,
    A: AuditSink + 'static,
{
    respond(StatusCode::OK, service.category_breakdown())
}
