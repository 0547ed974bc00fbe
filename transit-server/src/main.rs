use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use transit_server::cache::PlanCache;
use transit_server::config::ServerConfig;
use transit_server::planner::PlanningService;
use transit_server::timetable::TimetableHandle;
use transit_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,transit_server=debug")),
        )
        .init();

    let config = ServerConfig::from_env().expect("Invalid configuration");

    // Load the timetable (fail fast if unavailable)
    let source = config.timetable_source();
    let timetable = TimetableHandle::load(&source)
        .await
        .expect("Failed to load timetable");

    let planner = PlanningService::new(
        timetable,
        config.planner.clone(),
        PlanCache::new(&config.cache),
    );

    // Spawn background task to reload the timetable periodically
    if let Some(period) = config.refresh_interval {
        let planner_refresh = planner.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // First tick is immediate, skip it
            loop {
                interval.tick().await;
                if let Err(e) = planner_refresh.reload(&source).await {
                    warn!(error = %e, "Failed to refresh timetable; keeping previous snapshot");
                }
            }
        });
    }

    let app = create_router(AppState::new(planner));

    // Bind and serve
    let addr = config.bind_addr;
    info!("Transit planner listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET  /health             - Health check");
    info!("  POST /api/route          - Plan a route");
    info!("  GET  /api/stops          - List stops");
    info!("  GET  /api/stops/nearest  - Nearest stop to lat/lon");
    info!("  GET  /api/routes         - List routes");
    info!("  GET  /api/status         - Snapshot status");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
