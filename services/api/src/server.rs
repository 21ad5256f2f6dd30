use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_print_routes;
use axum::extract::DefaultBodyLimit;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use print_station::config::AppConfig;
use print_station::error::AppError;
use print_station::pipeline::{
    select_backend, PrintBackend, PrintDispatcher, PrintOptions, PrintSettings,
    PrintSubmissionService, QuotaLedger,
};
use print_station::roster::SeatPlan;
use print_station::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let roster = Arc::new(SeatPlan::from_path(&config.print.seat_plan_path)?);
    if roster.is_empty() {
        warn!(
            path = %config.print.seat_plan_path.display(),
            "seat plan loaded but contains no teams"
        );
    }
    std::fs::create_dir_all(&config.print.upload_root)?;

    let ledger = Arc::new(QuotaLedger::new(config.print.quota_path.clone()));
    let backend = select_backend(config.print.mode);
    let dispatcher = PrintDispatcher::new(backend, PrintOptions::from(&config.print));
    let printer_available = dispatcher.device_available();
    let backend_kind = dispatcher.backend().kind();

    let settings = PrintSettings::from(&config.print);
    // Slack on top of the file cap for multipart framing.
    let max_body = settings.max_file_bytes as usize + 64 * 1024;
    let service = Arc::new(PrintSubmissionService::new(
        roster.clone(),
        ledger,
        dispatcher,
        settings,
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        teams_loaded: roster.len(),
        printer_available,
    };

    let app = with_print_routes(service)
        .layer(Extension(app_state))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = backend_kind,
        printer_available,
        teams = roster.len(),
        upload_root = %config.print.upload_root.display(),
        quota_file = %config.print.quota_path.display(),
        max_pages = config.print.max_pages,
        attempts = config.print.attempts,
        timeout_secs = config.print.attempt_timeout.as_secs(),
        "print station ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
