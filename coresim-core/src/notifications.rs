//! 3GPP-styled JSON shapes for the service-based interface
//!
//! Subscription request bodies and notification envelopes. The schemas are
//! treated as opaque but stable: field names follow the 3GPP camelCase wire
//! form and optional fields are omitted when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use coresim_common::types::{
    AccessType, AmfEventType, CmState, DddStatus, LossOfConnectReason, PduSessType, PlmnId,
    RmState, SmfEvent, Snssai,
};

// ============================================================================
// Common location types
// ============================================================================

/// Tracking area identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tai {
    /// Operator PLMN
    pub plmn_id: PlmnId,
    /// Tracking area code (hex string)
    pub tac: String,
}

/// NR cell global identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ncgi {
    /// Operator PLMN
    pub plmn_id: PlmnId,
    /// NR cell identity (9 hex digits)
    pub nr_cell_id: String,
}

/// NR location information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NrLocation {
    /// Time the location was established
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ue_location_timestamp: Option<DateTime<Utc>>,
    /// Age of the location information in minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_of_location_information: Option<i32>,
    /// Tracking area
    pub tai: Tai,
    /// Cell identity
    pub ncgi: Ncgi,
}

/// Access-dependent user location container.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    /// NR location, the only access simulated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nr_location: Option<NrLocation>,
}

// ============================================================================
// AMF event exposure (Namf_EventExposure)
// ============================================================================

/// Subscription creation request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfCreateEventSubscription {
    /// Subscription content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<AmfEventSubscription>,
}

/// Subscribed event list and callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfEventSubscription {
    /// Requested event kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_list: Option<Vec<AmfEventItem>>,
    /// Callback URL notified for every listed event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_notify_uri: Option<String>,
}

/// One subscribed event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmfEventItem {
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: AmfEventType,
}

/// Active-state marker inside a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmfEventState {
    /// Whether the reported state is active
    pub active: bool,
}

/// Connection-management info attached to connectivity reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmInfo {
    /// CM state
    pub cm_state: CmState,
    /// Access type the state applies to
    pub access_type: AccessType,
}

/// Registration-management info attached to registration reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RmInfo {
    /// RM state
    pub rm_state: RmState,
    /// Access type the state applies to
    pub access_type: AccessType,
}

/// One event report inside an AMF notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfEventReport {
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: AmfEventType,
    /// Emission time
    pub time_stamp: DateTime<Utc>,
    /// Subscription permanent identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    /// MSISDN in E.164 format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpsi: Option<String>,
    /// Report state
    pub state: AmfEventState,
    /// Access types the report covers
    pub access_type_list: Vec<AccessType>,
    /// UE location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<UserLocation>,
    /// CM info, present on connectivity reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cm_info_list: Option<Vec<CmInfo>>,
    /// RM info, present on registration reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rm_info_list: Option<Vec<RmInfo>>,
    /// Reason, present on loss-of-connectivity reports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_of_connect_reason: Option<LossOfConnectReason>,
}

/// Notification envelope POSTed to AMF subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmfEventNotification {
    /// Reports in this notification
    pub report_list: Vec<AmfEventReport>,
}

// ============================================================================
// SMF event exposure (Nsmf_EventExposure)
// ============================================================================

/// Subscription creation request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NsmfEventExposure {
    /// Requested event kinds
    #[serde(rename = "eventSubscriptions", skip_serializing_if = "Option::is_none")]
    pub event_subs: Option<Vec<SmfEventSubscriptionItem>>,
    /// Callback URL notified for every listed event
    #[serde(rename = "notifUri", skip_serializing_if = "Option::is_none")]
    pub notif_uri: Option<String>,
}

/// One subscribed SMF event kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmfEventSubscriptionItem {
    /// Event kind
    pub event: SmfEvent,
}

/// Byte or packet volume triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    /// Downlink amount
    pub downlink: i64,
    /// Uplink amount
    pub uplink: i64,
    /// Total amount
    pub total: i64,
}

/// Usage report carried in QoS monitoring notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    /// Byte volumes
    pub volume: Volume,
    /// Packet counts
    #[serde(rename = "noP")]
    pub no_p: Volume,
    /// Report trigger
    pub trigger: String,
    /// PDU session the report covers
    pub se_id: i32,
}

/// Vendor extension container of an SMF event notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizedData {
    /// Usage report
    pub usage_report: UsageReport,
}

/// One event inside an SMF notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmfEventNotificationItem {
    /// Event kind
    pub event: SmfEvent,
    /// Emission time
    pub time_stamp: DateTime<Utc>,
    /// Subscription permanent identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supi: Option<String>,
    /// MSISDN in E.164 format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpsi: Option<String>,
    /// Data network name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnn: Option<String>,
    /// Slice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snssai: Option<Snssai>,
    /// Access type
    #[serde(rename = "accType", skip_serializing_if = "Option::is_none")]
    pub acc_type: Option<AccessType>,
    /// PDU session id
    #[serde(rename = "pduSeId", skip_serializing_if = "Option::is_none")]
    pub pdu_se_id: Option<i32>,
    /// Operator PLMN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plmn_id: Option<PlmnId>,
    /// Session address type, set for establishment and release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdu_sess_type: Option<PduSessType>,
    /// UE address, set for establishment and release
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_addr: Option<String>,
    /// Delivery status, set for DDDS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddd_status: Option<DddStatus>,
    /// Usage report, set for QoS monitoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customized_data: Option<CustomizedData>,
}

/// Notification envelope POSTed to SMF subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NsmfEventExposureNotification {
    /// Notification correlation id
    pub notif_id: String,
    /// Events in this notification
    pub event_notifs: Vec<SmfEventNotificationItem>,
}

// ============================================================================
// PCF policy authorization (Npcf_PolicyAuthorization)
// ============================================================================

/// Application session context carried on the PCF northbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSessionContext {
    /// Requested policy data
    #[serde(rename = "ascReqData", skip_serializing_if = "Option::is_none")]
    pub asc_req_data: Option<AscReqData>,
}

/// Policy request data inside an app session context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AscReqData {
    /// UE address the request targets
    #[serde(rename = "ueIpv4", skip_serializing_if = "Option::is_none")]
    pub ue_ipv4: Option<String>,
    /// Media components, present on QoS requests
    #[serde(rename = "medComponents", skip_serializing_if = "Option::is_none")]
    pub med_components: Option<Value>,
    /// AF routing requirement, present on routing requests
    #[serde(rename = "afRoutReq", skip_serializing_if = "Option::is_none")]
    pub af_rout_req: Option<Value>,
}
