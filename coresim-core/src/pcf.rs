//! Policy Control Function
//!
//! Holds app-session contexts created through the policy-authorization API.
//! Requests are validated against the IP allocator: a policy decision only
//! makes sense for an address currently bound to a UE session.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use coresim_common::bus::{BusError, DEFAULT_MAILBOX_CAPACITY};
use coresim_common::types::PlmnId;
use coresim_common::Runtime;

use crate::ipam::IpAllocator;
use crate::notifications::AppSessionContext;
use crate::sbi::SbiState;

/// PCF instance with its app-session registry.
#[derive(Clone)]
pub struct Pcf {
    /// Operator PLMN
    pub plmn: PlmnId,
    /// NF identifier, `PCF-{mcc}{mnc}`
    pub pcf_id: String,
    subscriptions: Arc<RwLock<HashMap<String, AppSessionContext>>>,
    ipam: Arc<IpAllocator>,
}

impl Pcf {
    /// Creates a PCF for the given PLMN, validating addresses against `ipam`.
    pub fn new(plmn: PlmnId, ipam: Arc<IpAllocator>) -> Self {
        let pcf_id = format!("PCF-{plmn}");
        Self {
            plmn,
            pcf_id,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            ipam,
        }
    }

    /// Registers the PCF mailbox on the bus. No UE-originated traffic is
    /// routed here today; the mailbox exists so the name resolves.
    pub fn spawn(&self, runtime: &Runtime) -> Result<(), BusError> {
        info!("[{}] started", self.pcf_id);
        runtime
            .bus
            .start_task("PCF", DEFAULT_MAILBOX_CAPACITY, |_msg| async {})
    }

    /// Number of live app-session contexts.
    pub async fn session_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

// ============================================================================
// Northbound API
// ============================================================================

/// `POST /npcf-policyauthorization/v1/app-sessions`
///
/// Validates the UE address against the allocator, classifies the request
/// as QoS or routing, stores the context and answers 201 with a `Location`
/// header naming the new app session.
pub async fn handle_new_app_session(
    State(state): State<SbiState>,
    Json(body): Json<AppSessionContext>,
) -> Response {
    let Some(req_data) = body.asc_req_data.clone() else {
        return (StatusCode::BAD_REQUEST, "Missing ascReqData").into_response();
    };
    let Some(ue_addr) = req_data.ue_ipv4.clone() else {
        return (StatusCode::BAD_REQUEST, "Missing Ue Ipv4 Address").into_response();
    };

    let Some((supi, pdu_sess_id)) = parse_addr(&ue_addr, &state.pcf.ipam).await else {
        return (
            StatusCode::NOT_FOUND,
            "requested UE is not connected to the network",
        )
            .into_response();
    };

    info!("received new policy decision for UE {supi}, pduSessId {pdu_sess_id}");

    if req_data.med_components.is_some() {
        // QoS request, would create a new flow on the target session
    } else if req_data.af_rout_req.is_some() {
        // Routing request, would reconfigure the UP path
    } else {
        return (StatusCode::BAD_REQUEST, "unsupported policy request").into_response();
    }

    let sub_id = Uuid::new_v4().to_string();
    let location = format!("/npcf-policyauthorization/v1/app-sessions/{sub_id}");

    state
        .pcf
        .subscriptions
        .write()
        .await
        .insert(sub_id, body.clone());
    info!("[{}] created new subscription", state.pcf.pcf_id);

    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

/// `POST /npcf-policyauthorization/v1/app-sessions/{appSessId}/delete`
pub async fn handle_delete_app_session(
    State(state): State<SbiState>,
    Path(app_sess_id): Path<String>,
) -> Response {
    let mut subscriptions = state.pcf.subscriptions.write().await;
    if subscriptions.remove(&app_sess_id).is_some() {
        info!("[{}] deleted subscription", state.pcf.pcf_id);
        StatusCode::OK.into_response()
    } else {
        (StatusCode::NOT_FOUND, "app-session context is not found").into_response()
    }
}

/// `POST /npcf-policyauthorization/v1/app-sessions/{appSessId}`
pub async fn handle_update_app_session(State(state): State<SbiState>) -> Response {
    info!("[{}] rejected app-session update", state.pcf.pcf_id);
    (
        StatusCode::NOT_IMPLEMENTED,
        "policy update is not supported yet",
    )
        .into_response()
}

async fn parse_addr(addr: &str, ipam: &IpAllocator) -> Option<(String, i32)> {
    let ip: Ipv4Addr = addr.parse().ok()?;
    ipam.lookup(ip).await
}
