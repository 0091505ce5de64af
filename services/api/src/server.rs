use crate::cli::ServeArgs;
use crate::infra::{load_catalog, AllocationServices, AppState};
use crate::routes::with_allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use timetable_allocation::config::AppConfig;
use timetable_allocation::error::AppError;
use timetable_allocation::telemetry;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = load_catalog(args.seed_csv.as_deref())?;
    let seeded_years = catalog.years();
    if let Some(path) = args.seed_csv.as_ref() {
        info!(path = %path.display(), years = ?seeded_years, "seeded priority catalog");
    }
    let services = AllocationServices::from_catalog(catalog, config.allocation.run_timeout);

    let app = with_allocation_routes(services.engine, services.intake)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        run_timeout = ?config.allocation.run_timeout,
        "subject allocation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
