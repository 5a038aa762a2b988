//! Service-based interface router
//!
//! Assembles the northbound APIs of the three network functions on a single
//! router served from the SBI port.

use std::sync::Arc;

use axum::routing::{any, post};
use axum::Router;

use crate::amf::{self, Amf};
use crate::pcf::{self, Pcf};
use crate::smf::{self, Smf};

/// Shared handler state for the SBI router.
#[derive(Clone)]
pub struct SbiState {
    /// Access and mobility function
    pub amf: Arc<Amf>,
    /// Session management function
    pub smf: Arc<Smf>,
    /// Policy control function
    pub pcf: Arc<Pcf>,
}

/// Builds the SBI router over the three network functions.
pub fn sbi_router(state: SbiState) -> Router {
    Router::new()
        .route("/namf-evts/v1/subscriptions", post(amf::handle_new_subscription))
        .route(
            "/nsmf-event-exposure/v1/subscriptions",
            post(smf::handle_new_subscription),
        )
        .route(
            "/npcf-policyauthorization/v1/app-sessions",
            post(pcf::handle_new_app_session),
        )
        .route(
            "/npcf-policyauthorization/v1/app-sessions/:app_sess_id/delete",
            post(pcf::handle_delete_app_session),
        )
        .route(
            "/npcf-policyauthorization/v1/app-sessions/:app_sess_id",
            any(pcf::handle_update_app_session),
        )
        .with_state(state)
}
