use crate::infra::{parse_date, AppState, Library};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use smart_library::error::AppError;
use smart_library::library::{
    library_router, AuditEvent, AuditEventKind, InMemoryCatalogRepository,
    InMemoryPatronRepository,
};
use smart_library::recommendations::{recommendation_router, RecommendationService};
use smart_library::reports;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) type Recommendations =
    RecommendationService<InMemoryPatronRepository, InMemoryCatalogRepository>;

const DEFAULT_REPORT_COUNT: usize = 10;

#[derive(Debug, Serialize)]
pub(crate) struct DailyAudit {
    pub(crate) date: NaiveDate,
    pub(crate) counts: BTreeMap<AuditEventKind, usize>,
    pub(crate) events: Vec<AuditEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default)]
    pub(crate) count: Option<usize>,
}

pub(crate) fn with_library_routes(
    library: Arc<Library>,
    recommendations: Arc<Recommendations>,
) -> Router {
    library_router(library)
        .merge(recommendation_router(recommendations))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/audit", get(audit_endpoint))
        .route("/api/v1/audit/daily/:date", get(daily_audit_endpoint))
        .route("/api/v1/reports/overdue", get(overdue_report_endpoint))
        .route("/api/v1/reports/popular", get(popular_report_endpoint))
        .route("/api/v1/reports/patrons", get(patron_report_endpoint))
        .route("/api/v1/reports/categories", get(category_report_endpoint))
        .route("/api/v1/reports/daily/:date", get(daily_report_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Audit trail, newest first.
pub(crate) async fn audit_endpoint(Extension(state): Extension<AppState>) -> Json<Vec<AuditEvent>> {
    Json(state.audit.history())
}

pub(crate) async fn daily_audit_endpoint(
    Extension(state): Extension<AppState>,
    Path(raw_date): Path<String>,
) -> Response {
    let date = match parse_date(&raw_date) {
        Ok(date) => date,
        Err(message) => return bad_request(message),
    };

    let body = DailyAudit {
        date,
        counts: state.audit.daily_counts(date),
        events: state.audit.on_date(date),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub(crate) async fn overdue_report_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Response, AppError> {
    let notices = state.library.overdue_report()?;
    let body = reports::overdue_report(&notices, state.library.now())?;
    Ok(csv_response(body))
}

pub(crate) async fn popular_report_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let items = state
        .library
        .most_popular(query.count.unwrap_or(DEFAULT_REPORT_COUNT))?;
    let body = reports::popular_items(&items, state.library.now())?;
    Ok(csv_response(body))
}

pub(crate) async fn patron_report_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Response, AppError> {
    let patrons = state.library.patrons()?;
    let body = reports::patron_activity(&patrons, state.library.now())?;
    Ok(csv_response(body))
}

pub(crate) async fn category_report_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Response, AppError> {
    let rows = state.library.category_breakdown()?;
    let body = reports::category_analysis(&rows, state.library.now())?;
    Ok(csv_response(body))
}

pub(crate) async fn daily_report_endpoint(
    Extension(state): Extension<AppState>,
    Path(raw_date): Path<String>,
) -> Result<Response, AppError> {
    let date = match parse_date(&raw_date) {
        Ok(date) => date,
        Err(message) => return Ok(bad_request(message)),
    };

    let body = reports::daily_activity(
        date,
        &state.audit.daily_counts(date),
        &state.audit.on_date(date),
        state.library.now(),
    )?;
    Ok(csv_response(body))
}

fn csv_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, reports::MEDIA_TYPE.as_ref())],
        body,
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
