use crate::cli::ServeArgs;
use crate::infra::{build_library, seed_catalog, AppState};
use crate::routes::with_library_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use smart_library::clock::SystemClock;
use smart_library::config::AppConfig;
use smart_library::error::AppError;
use smart_library::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (library, audit) = build_library(Arc::new(SystemClock));
    if args.seed {
        let seeded = seed_catalog(&library)?;
        info!(items = seeded, "sample catalog loaded");
    }
    let recommendations =
        Arc::new(library.recommendations().with_defaults(config.recommendations));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        audit,
        library: library.clone(),
    };

    let app = with_library_routes(library, recommendations)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "smart library ready");

    axum::serve(listener, app).await?;
    Ok(())
}
