//! HTTP route handlers.

use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::domain::Coordinate;
use crate::locator::StopLocator;
use crate::planner::PlanError;

use super::dto::*;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/route", post(plan_route))
        .route("/api/stops", get(list_stops))
        .route("/api/stops/nearest", get(nearest_stop))
        .route("/api/routes", get(list_routes))
        .route("/api/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Plan the earliest-arrival route between two endpoints.
async fn plan_route(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PlanRouteResponse>, AppError> {
    // Parse JSON manually so we can log the body on failure
    let req: PlanRouteRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, body = %String::from_utf8_lossy(&body), "Invalid plan request JSON");
        AppError::BadRequest {
            message: format!("Invalid JSON: {e}"),
        }
    })?;

    let request = req
        .into_plan_request()
        .map_err(|message| AppError::BadRequest { message })?;

    let plan = state.planner.plan(request).await?;

    Ok(Json(PlanRouteResponse::from_plan(&plan)))
}

/// List every stop of the current timetable.
async fn list_stops(State(state): State<AppState>) -> Json<Vec<StopResult>> {
    let snapshot = state.planner.snapshot().await;
    let stops = snapshot
        .index()
        .stops()
        .iter()
        .map(StopResult::from_stop)
        .collect();
    Json(stops)
}

/// Find the stop nearest to a location, within the snap distance.
async fn nearest_stop(
    State(state): State<AppState>,
    Query(query): Query<NearestStopQuery>,
) -> Result<Json<NearestStopResponse>, AppError> {
    let (Some(lat), Some(lon)) = (query.lat, query.lon) else {
        return Err(AppError::BadRequest {
            message: "lat and lon are required".to_string(),
        });
    };
    let coordinate = Coordinate::new(lat, lon).map_err(|e| AppError::BadRequest {
        message: e.to_string(),
    })?;

    let snapshot = state.planner.snapshot().await;
    let locator = StopLocator::new(snapshot.index(), state.planner.config().max_snap_m);
    let resolved = locator
        .nearest(&coordinate)
        .map_err(|e| AppError::NotFound {
            message: e.to_string(),
        })?;

    let stop = snapshot.index().stop(resolved.stop);
    Ok(Json(NearestStopResponse {
        id: stop.id.as_str().to_string(),
        name: stop.name.clone(),
        distance_m: resolved.distance_m,
    }))
}

/// List every route of the current timetable.
async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteResult>> {
    let snapshot = state.planner.snapshot().await;
    let routes = snapshot
        .index()
        .routes()
        .iter()
        .map(RouteResult::from_route)
        .collect();
    Json(routes)
}

/// Report the loaded snapshot.
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.planner.snapshot().await;
    Json(StatusResponse::from_snapshot(
        &snapshot,
        state.planner.cache().entry_count(),
    ))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    Timeout { message: String },
    Internal { message: String },
}

impl From<PlanError> for AppError {
    fn from(e: PlanError) -> Self {
        let message = e.to_string();
        match e {
            PlanError::InvalidRequest(_) => AppError::BadRequest { message },
            PlanError::NotFound { .. } => AppError::NotFound { message },
            PlanError::Timeout => AppError::Timeout { message },
            PlanError::Internal(_) => AppError::Internal { message },
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest { message }
            | AppError::NotFound { message }
            | AppError::Timeout { message }
            | AppError::Internal { message } => message,
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}
