//! Session Management Function
//!
//! Consumes UE session events from the bus and fans out event-exposure
//! notifications. Establishment and release carry the session address, QoS
//! monitoring carries a usage report.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use coresim_common::bus::{BusError, DEFAULT_MAILBOX_CAPACITY};
use coresim_common::messages::{BusPayload, UeToSmfMsg};
use coresim_common::types::{PlmnId, SmfEvent};
use coresim_common::Runtime;

use crate::notifications::{
    CustomizedData, NsmfEventExposure, NsmfEventExposureNotification, SmfEventNotificationItem,
    UsageReport, Volume,
};
use crate::notify::post_notification;
use crate::sbi::SbiState;

/// SMF instance with its subscription registry.
#[derive(Clone)]
pub struct Smf {
    /// Operator PLMN
    pub plmn: PlmnId,
    /// NF identifier, `SMF-{mcc}{mnc}`
    pub smf_id: String,
    subscriptions: Arc<RwLock<HashMap<SmfEvent, Vec<String>>>>,
    client: reqwest::Client,
}

impl Smf {
    /// Creates an SMF for the given PLMN.
    pub fn new(plmn: PlmnId) -> Self {
        let smf_id = format!("SMF-{plmn}");
        Self {
            plmn,
            smf_id,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            client: reqwest::Client::new(),
        }
    }

    /// Registers the SMF mailbox on the bus and starts consuming.
    pub fn spawn(&self, runtime: &Runtime) -> Result<(), BusError> {
        info!("[{}] started", self.smf_id);
        let smf = self.clone();
        runtime.bus.start_task("SMF", DEFAULT_MAILBOX_CAPACITY, move |msg| {
            let smf = smf.clone();
            async move {
                if let BusPayload::UeToSmf(event) = msg.payload {
                    smf.handle_ue_event(event).await;
                }
            }
        })
    }

    /// Appends a callback URL for one event kind, duplicates kept.
    pub async fn subscribe(&self, event: SmfEvent, url: String) {
        self.subscriptions.write().await.entry(event).or_default().push(url);
    }

    /// Number of callbacks registered for one event kind.
    pub async fn subscriber_count(&self, event: SmfEvent) -> usize {
        self.subscriptions
            .read()
            .await
            .get(&event)
            .map_or(0, Vec::len)
    }

    async fn handle_ue_event(&self, msg: UeToSmfMsg) {
        let event = msg.event_type;
        let notification = NsmfEventExposureNotification {
            notif_id: Uuid::new_v4().to_string(),
            event_notifs: vec![build_event_notification(&msg)],
        };

        let body = match serde_json::to_vec(&notification) {
            Ok(body) => body,
            Err(e) => {
                error!("[{}] error while marshalling notification: {e}", self.smf_id);
                return;
            }
        };

        let subscriptions = self.subscriptions.read().await;
        if let Some(urls) = subscriptions.get(&event) {
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

/// Builds the event item for one UE session snapshot.
pub(crate) fn build_event_notification(msg: &UeToSmfMsg) -> SmfEventNotificationItem {
    let mut item = SmfEventNotificationItem {
        event: msg.event_type,
        time_stamp: msg.timestamp,
        supi: Some(msg.supi.clone()),
        gpsi: Some(msg.gpsi.clone()),
        dnn: Some(msg.dnn.clone()),
        snssai: Some(msg.snssai.clone()),
        acc_type: Some(msg.access_type),
        pdu_se_id: Some(msg.pdu_sess_id),
        plmn_id: Some(msg.plmn.clone()),
        pdu_sess_type: None,
        ipv4_addr: None,
        ddd_status: None,
        customized_data: None,
    };

    match msg.event_type {
        SmfEvent::PduSesEst | SmfEvent::PduSesRel => {
            item.pdu_sess_type = Some(msg.pdu_sess_type);
            item.ipv4_addr = Some(msg.ue_address.to_string());
        }
        SmfEvent::Ddds => {
            item.ddd_status = msg.ddds_state;
        }
        SmfEvent::QosMon => {
            if let Some(report) = &msg.up_report {
                item.customized_data = Some(CustomizedData {
                    usage_report: UsageReport {
                        volume: Volume {
                            downlink: report.stats.total_dl_bytes,
                            uplink: report.stats.total_ul_bytes,
                            total: report.stats.total_bytes,
                        },
                        no_p: Volume {
                            downlink: report.stats.num_dl_packets,
                            uplink: report.stats.num_ul_packets,
                            total: report.stats.num_of_packets,
                        },
                        trigger: "PERIODIC".to_string(),
                        se_id: msg.pdu_sess_id,
                    },
                });
            }
        }
        SmfEvent::CommFail => {}
    }

    item
}

// ============================================================================
// Northbound API
// ============================================================================

/// `POST /nsmf-event-exposure/v1/subscriptions`
///
/// Appends the callback URL to every listed event kind and echoes the body
/// with 201 Created.
pub async fn handle_new_subscription(
    State(state): State<SbiState>,
    Json(body): Json<NsmfEventExposure>,
) -> Response {
    let Some(event_subs) = body.event_subs.clone() else {
        return (StatusCode::BAD_REQUEST, "could not find event list").into_response();
    };
    let Some(callback_url) = body.notif_uri.clone() else {
        return (
            StatusCode::BAD_REQUEST,
            "could not find callbackUri information",
        )
            .into_response();
    };

    for item in event_subs {
        state.smf.subscribe(item.event, callback_url.clone()).await;
    }

    info!(
        "[{}] created new subscription for: {}",
        state.smf.smf_id, callback_url
    );
    (StatusCode::CREATED, Json(body)).into_response()
}
