//! OAM HTTP endpoints
//!
//! The operations interface drives the lifecycle controller. When the
//! config file already carries a simulation profile, the configure body is
//! ignored in its favor.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use coresim_common::config::NetworkConfig;

use crate::controller::{SimController, SimulationStatus};

/// Shared handler state for the OAM router.
#[derive(Clone)]
pub struct OamState {
    /// Lifecycle controller
    pub controller: Arc<SimController>,
    /// Profile from the config file, preferred over request bodies
    pub file_profile: Option<NetworkConfig>,
}

/// Response envelope of every OAM endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Current lifecycle state
    #[serde(rename = "Status")]
    pub status: SimulationStatus,
}

/// Builds the OAM router.
pub fn oam_router(state: OamState) -> Router {
    Router::new()
        .route("/core-simulator/v1/configure", post(handle_configure))
        .route("/core-simulator/v1/start", post(handle_start))
        .route("/core-simulator/v1/status", get(handle_status))
        .route("/core-simulator/v1/stop", post(handle_stop))
        .with_state(state)
}

async fn handle_configure(
    State(state): State<OamState>,
    body: Option<Json<NetworkConfig>>,
) -> Response {
    let config = match state.file_profile.clone() {
        Some(profile) => profile,
        None => match body {
            Some(Json(config)) => config,
            None => return (StatusCode::BAD_REQUEST, "Invalid request body").into_response(),
        },
    };

    match state.controller.configure(config).await {
        Ok(status) => Json(StatusResponse { status }).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_start(State(state): State<OamState>) -> Response {
    match state.controller.start().await {
        Ok(status) => Json(StatusResponse { status }).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn handle_status(State(state): State<OamState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.controller.status().await,
    })
}

async fn handle_stop(State(state): State<OamState>) -> Response {
    match state.controller.stop().await {
        Ok(status) => Json(StatusResponse { status }).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
