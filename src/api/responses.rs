//! API request and response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    dispatch::NavigationOutcome,
    state::{ScheduledWakeUp, SiteState},
};

/// Body of `POST /navigate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

/// Body of `POST /sites`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSiteRequest {
    pub domain: String,
    #[serde(default)]
    pub disruptions_ms: Vec<u64>,
    #[serde(default)]
    pub lockdown_ms: u64,
}

/// Query of `GET /blocked`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedQuery {
    pub url: String,
}

/// What the block page needs to show and later restore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedResponse {
    pub url: String,
    pub domain: String,
    pub state: Option<SiteState>,
    pub next_event_ms: Option<u64>,
}

/// Service status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub active_domain: Option<String>,
    pub pending_wake_up: Option<ScheduledWakeUp>,
    pub last_outcome: Option<NavigationOutcome>,
    pub last_outcome_time: Option<DateTime<Utc>>,
    pub block_page: String,
    pub uptime: String,
    pub port: u16,
    pub host: String,
}

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
