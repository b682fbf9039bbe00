//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    dispatch::{NavigationOutcome, SiteSnapshot},
    error::SiteError,
    state::{AppState, TimedSite},
    utils::domain_of,
};
use super::responses::{
    BlockedQuery, BlockedResponse, ErrorResponse, HealthResponse, NavigateRequest,
    RegisterSiteRequest, StatusResponse,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a failure to a status code, logging server-side faults
fn api_error(context: &str, e: SiteError) -> ApiError {
    let status = match e {
        SiteError::InvalidUrl { .. } | SiteError::MissingHost(_) | SiteError::EmptyDomain => {
            warn!("{}: {}", context, e);
            StatusCode::BAD_REQUEST
        }
        _ => {
            error!("{}: {}", context, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Handle POST /navigate - Apply a tab navigation and return the action to take
pub async fn navigate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<NavigationOutcome>, ApiError> {
    match state.navigate(&request.url) {
        Ok(outcome) => {
            info!("Navigation to {} -> {:?}", outcome.domain, outcome.action);
            Ok(Json(outcome))
        }
        Err(e) => Err(api_error("Failed to handle navigation", e)),
    }
}

/// Handle POST /sites - Register a domain or reset its timers
pub async fn register_site_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterSiteRequest>,
) -> Result<(StatusCode, Json<TimedSite>), ApiError> {
    state
        .register_site(&request.domain, request.disruptions_ms, request.lockdown_ms)
        .map(|site| (StatusCode::CREATED, Json(site)))
        .map_err(|e| api_error("Failed to register site", e))
}

/// Handle GET /sites - Preview every monitored domain
pub async fn list_sites_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SiteSnapshot>>, ApiError> {
    state
        .site_snapshots()
        .map(Json)
        .map_err(|e| api_error("Failed to list sites", e))
}

/// Handle GET /sites/:domain - Preview one monitored domain
pub async fn site_handler(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Result<Json<SiteSnapshot>, ApiError> {
    match state.site_snapshot(&domain) {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("{} is not monitored", domain))),
        )),
        Err(e) => Err(api_error("Failed to read site", e)),
    }
}

/// Handle GET /blocked - Describe the page a blocked tab was sent away from
pub async fn blocked_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BlockedQuery>,
) -> Result<Json<BlockedResponse>, ApiError> {
    let domain = domain_of(&query.url).map_err(|e| api_error("Invalid blocked url", e))?;
    let snapshot = state
        .site_snapshot(&domain)
        .map_err(|e| api_error("Failed to read site", e))?;

    Ok(Json(BlockedResponse {
        url: query.url,
        domain,
        state: snapshot.as_ref().map(|s| s.state),
        next_event_ms: snapshot.map(|s| s.next_event_ms).filter(|&ms| ms > 0),
    }))
}

/// Handle GET /status - Return current service status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let active_domain = state
        .active_domain()
        .map_err(|e| api_error("Failed to read active domain", e))?;
    let (last_outcome, last_outcome_time) = state.get_last_outcome();

    Ok(Json(StatusResponse {
        active_domain,
        pending_wake_up: state.pending_wake_up(),
        last_outcome,
        last_outcome_time,
        block_page: state.block_page().to_string(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
