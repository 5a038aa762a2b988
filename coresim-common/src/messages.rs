//! Messages carried on the internal event bus
//!
//! UEs publish state snapshots toward the network functions. Consumers read
//! the snapshot fields only, never the live UE state, so a message stays
//! valid after the UE has moved on.

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::types::{
    AccessType, AmfEventType, CmState, DddStatus, PduSessType, PlmnId, RmState, SmfEvent, Snssai,
};
use crate::up_stats::UpStatsReport;

/// Snapshot of UE state sent toward the AMF.
#[derive(Debug, Clone)]
pub struct UeToAmfMsg {
    /// Event kind the snapshot reports
    pub event_type: AmfEventType,
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// RM state at emission
    pub rm_state: RmState,
    /// CM state at emission
    pub cm_state: CmState,
    /// Subscription permanent identifier
    pub supi: String,
    /// MSISDN in E.164 format
    pub gpsi: String,
    /// Operator PLMN
    pub plmn: PlmnId,
    /// Serving cell at emission
    pub current_cell_id: String,
    /// Access type
    pub access_type: AccessType,
}

/// Snapshot of UE session state sent toward the SMF.
#[derive(Debug, Clone)]
pub struct UeToSmfMsg {
    /// Event kind the snapshot reports
    pub event_type: SmfEvent,
    /// Emission time
    pub timestamp: DateTime<Utc>,
    /// Subscription permanent identifier
    pub supi: String,
    /// MSISDN in E.164 format
    pub gpsi: String,
    /// Operator PLMN
    pub plmn: PlmnId,
    /// Access type
    pub access_type: AccessType,
    /// Data network name of the session
    pub dnn: String,
    /// Slice of the session
    pub snssai: Snssai,
    /// UE address of the session
    pub ue_address: Ipv4Addr,
    /// Session address type
    pub pdu_sess_type: PduSessType,
    /// PDU session id
    pub pdu_sess_id: i32,
    /// Delivery status, set for DDDS events
    pub ddds_state: Option<DddStatus>,
    /// Usage report, set for QOS_MON events
    pub up_report: Option<UpStatsReport>,
}

/// Tagged payload delivered through a bus mailbox.
///
/// Reverse-direction variants (network to UE) are reserved; today the core
/// functions only consume.
#[derive(Debug, Clone)]
pub enum BusPayload {
    /// UE-originated AMF event
    UeToAmf(UeToAmfMsg),
    /// UE-originated SMF event
    UeToSmf(UeToSmfMsg),
}

impl BusPayload {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            BusPayload::UeToAmf(_) => "UeToAmf",
            BusPayload::UeToSmf(_) => "UeToSmf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind() {
        let msg = UeToAmfMsg {
            event_type: AmfEventType::LocationReport,
            timestamp: Utc::now(),
            rm_state: RmState::Registered,
            cm_state: CmState::Connected,
            supi: "208950000000001".to_string(),
            gpsi: "+33612345678".to_string(),
            plmn: PlmnId::new("208", "95"),
            current_cell_id: "000000001".to_string(),
            access_type: AccessType::ThreeGppAccess,
        };
        assert_eq!(BusPayload::UeToAmf(msg).kind(), "UeToAmf");
    }
}
