//! Access and Mobility Management Function
//!
//! Consumes UE mobility events from the bus, turns each into a 3GPP event
//! report and fans the notification out to every subscriber registered for
//! that event kind.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::RwLock;
use tracing::{error, info};

use coresim_common::bus::{BusError, DEFAULT_MAILBOX_CAPACITY};
use coresim_common::messages::{BusPayload, UeToAmfMsg};
use coresim_common::types::{AmfEventType, LossOfConnectReason, PlmnId};
use coresim_common::Runtime;

use crate::notifications::{
    AmfCreateEventSubscription, AmfEventNotification, AmfEventReport, AmfEventState, CmInfo, Ncgi,
    NrLocation, RmInfo, Tai, UserLocation,
};
use crate::notify::post_notification;
use crate::sbi::SbiState;

/// Tracking area code reported for every cell.
const REPORTED_TAC: &str = "001010";

/// AMF instance with its subscription registry.
#[derive(Clone)]
pub struct Amf {
    /// Operator PLMN
    pub plmn: PlmnId,
    /// NF identifier, `AMF-{mcc}{mnc}`
    pub amf_id: String,
    subscriptions: Arc<RwLock<HashMap<AmfEventType, Vec<String>>>>,
    client: reqwest::Client,
}

impl Amf {
    /// Creates an AMF for the given PLMN.
    pub fn new(plmn: PlmnId) -> Self {
        let amf_id = format!("AMF-{plmn}");
        Self {
            plmn,
            amf_id,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            client: reqwest::Client::new(),
        }
    }

    /// Registers the AMF mailbox on the bus and starts consuming.
    pub fn spawn(&self, runtime: &Runtime) -> Result<(), BusError> {
        info!("[{}] started", self.amf_id);
        let amf = self.clone();
        runtime.bus.start_task("AMF", DEFAULT_MAILBOX_CAPACITY, move |msg| {
            let amf = amf.clone();
            async move {
                if let BusPayload::UeToAmf(event) = msg.payload {
                    amf.handle_ue_event(event).await;
                }
            }
        })
    }

    /// Appends a callback URL for one event kind. Duplicates are kept so
    /// fan-out multiplicity is preserved.
    pub async fn subscribe(&self, event: AmfEventType, url: String) {
        self.subscriptions.write().await.entry(event).or_default().push(url);
    }

    /// Number of callbacks registered for one event kind.
    pub async fn subscriber_count(&self, event: AmfEventType) -> usize {
        self.subscriptions
            .read()
            .await
            .get(&event)
            .map_or(0, Vec::len)
    }

    async fn handle_ue_event(&self, msg: UeToAmfMsg) {
        let event_type = msg.event_type;
        let notification = AmfEventNotification {
            report_list: vec![build_report(&msg)],
        };

        let body = match serde_json::to_vec(&notification) {
            Ok(body) => body,
            Err(e) => {
                error!("[{}] error while marshalling notification: {e}", self.amf_id);
                return;
            }
        };

        let subscriptions = self.subscriptions.read().await;
        if let Some(urls) = subscriptions.get(&event_type) {
            for url in urls {
                tokio::spawn(post_notification(
                    self.client.clone(),
                    url.clone(),
                    body.clone(),
                ));
            }
        }
    }
}

/// Builds the event report for one UE snapshot.
pub(crate) fn build_report(msg: &UeToAmfMsg) -> AmfEventReport {
    let mut report = AmfEventReport {
        event_type: msg.event_type,
        time_stamp: msg.timestamp,
        supi: Some(msg.supi.clone()),
        gpsi: Some(msg.gpsi.clone()),
        state: AmfEventState { active: true },
        access_type_list: vec![msg.access_type],
        location: Some(UserLocation {
            nr_location: Some(NrLocation {
                ue_location_timestamp: Some(msg.timestamp),
                age_of_location_information: Some(0),
                tai: Tai {
                    plmn_id: msg.plmn.clone(),
                    tac: REPORTED_TAC.to_string(),
                },
                ncgi: Ncgi {
                    plmn_id: msg.plmn.clone(),
                    nr_cell_id: msg.current_cell_id.clone(),
                },
            }),
        }),
        cm_info_list: None,
        rm_info_list: None,
        loss_of_connect_reason: None,
    };

    match msg.event_type {
        AmfEventType::ConnectivityStateReport => {
            report.cm_info_list = Some(vec![CmInfo {
                cm_state: msg.cm_state,
                access_type: msg.access_type,
            }]);
        }
        AmfEventType::RegistrationStateReport => {
            report.rm_info_list = Some(vec![RmInfo {
                rm_state: msg.rm_state,
                access_type: msg.access_type,
            }]);
        }
        AmfEventType::LossOfConnectivity => {
            report.loss_of_connect_reason = Some(LossOfConnectReason::Deregistered);
        }
        AmfEventType::LocationReport | AmfEventType::UesInAreaReport => {}
    }

    report
}

// ============================================================================
// Northbound API
// ============================================================================

/// `POST /namf-evts/v1/subscriptions`
///
/// Appends the callback URL to every listed event kind and echoes the body
/// with 201 Created.
pub async fn handle_new_subscription(
    State(state): State<SbiState>,
    Json(body): Json<AmfCreateEventSubscription>,
) -> Response {
    let Some(subscription) = body.subscription.clone() else {
        return (
            StatusCode::BAD_REQUEST,
            "could not find subscription information",
        )
            .into_response();
    };
    let Some(callback_url) = subscription.event_notify_uri.clone() else {
        return (
            StatusCode::BAD_REQUEST,
            "could not find callbackUri information",
        )
            .into_response();
    };

    for item in subscription.event_list.unwrap_or_default() {
        state.amf.subscribe(item.event_type, callback_url.clone()).await;
    }

    info!(
        "[{}] created new subscription for: {}",
        state.amf.amf_id, callback_url
    );
    (StatusCode::CREATED, Json(body)).into_response()
}
