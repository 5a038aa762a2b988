//! Core 5G types: PLMN, S-NSSAI, RM/CM states, event kinds
//!
//! The serde renames on the wire-visible enums follow the 3GPP JSON string
//! values so notification payloads stay stable for downstream consumers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Public Land Mobile Network identifier.
///
/// MCC and MNC are kept as decimal strings: they are concatenated verbatim
/// into SUPIs and NF identifiers, and serialized as strings in 3GPP JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlmnId {
    /// Mobile Country Code (3 digits)
    pub mcc: String,
    /// Mobile Network Code (2-3 digits)
    pub mnc: String,
}

impl PlmnId {
    /// Creates a new PLMN with the given MCC and MNC.
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }
}

impl fmt::Display for PlmnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mcc, self.mnc)
    }
}

/// Single Network Slice Selection Assistance Information.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snssai {
    /// Slice/Service Type
    pub sst: u8,
    /// Slice Differentiator (6 hex digits)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

impl fmt::Display for Snssai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sd {
            Some(sd) => write!(f, "sst={} sd={}", self.sst, sd),
            None => write!(f, "sst={}", self.sst),
        }
    }
}

/// Access type over which the UE is served.
///
/// Only 3GPP access is simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessType {
    /// 3GPP access (NR)
    #[default]
    #[serde(rename = "3GPP_ACCESS")]
    ThreeGppAccess,
    /// Non-3GPP access (untrusted WLAN etc.)
    #[serde(rename = "NON_3GPP_ACCESS")]
    NonThreeGppAccess,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::ThreeGppAccess => write!(f, "3GPP_ACCESS"),
            AccessType::NonThreeGppAccess => write!(f, "NON_3GPP_ACCESS"),
        }
    }
}

/// Registration management state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RmState {
    /// RM-DEREGISTERED
    #[default]
    #[serde(rename = "DEREGISTERED")]
    Deregistered,
    /// RM-REGISTERED
    #[serde(rename = "REGISTERED")]
    Registered,
}

impl RmState {
    /// Metric label value for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            RmState::Deregistered => "DEREGISTERED",
            RmState::Registered => "REGISTERED",
        }
    }
}

impl fmt::Display for RmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection management state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CmState {
    /// CM-IDLE
    #[default]
    #[serde(rename = "IDLE")]
    Idle,
    /// CM-CONNECTED
    #[serde(rename = "CONNECTED")]
    Connected,
}

impl fmt::Display for CmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmState::Idle => write!(f, "IDLE"),
            CmState::Connected => write!(f, "CONNECTED"),
        }
    }
}

/// Behavioral state of a UE in its Markov chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UeState {
    /// Powered on, not registered
    #[default]
    Deregistered,
    /// Registered, signalling not yet active
    Registered,
    /// Signalling active, no PDU session yet
    Attached,
    /// PDU session established, no recent traffic
    Idle,
    /// PDU session established with recent UL/DL activity
    Connected,
    /// Transient handover state
    Handover,
}

impl fmt::Display for UeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UeState::Deregistered => "Deregistered",
            UeState::Registered => "Registered",
            UeState::Attached => "Attached",
            UeState::Idle => "Idle",
            UeState::Connected => "Connected",
            UeState::Handover => "Handover",
        };
        write!(f, "{s}")
    }
}

/// Procedure attached to a Markov transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UeProcedure {
    /// No action
    #[default]
    NoProcedure,
    /// Initial registration
    Registration,
    /// Signalling attach
    Attach,
    /// PDU session establishment
    PduSessionEstablishment,
    /// PDU session establishment failure
    PduSessionFailure,
    /// PDU session release
    PduSessionRelease,
    /// RF loss / deregistration
    LossOfConnection,
    /// Idle mode entry
    Sleep,
    /// Network-initiated paging
    Paging,
    /// Handover completed
    HandoverSuccessful,
    /// Handover failed
    HandoverFailure,
    /// Handover started
    HandoverInitiated,
}

impl fmt::Display for UeProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UeProcedure::NoProcedure => "NONE",
            UeProcedure::Registration => "REGISTRATION",
            UeProcedure::Attach => "ATTACH",
            UeProcedure::PduSessionEstablishment => "PDU_SES_EST",
            UeProcedure::PduSessionFailure => "PDU_SES_FAIL",
            UeProcedure::PduSessionRelease => "PDU_SES_REL",
            UeProcedure::LossOfConnection => "LOSS_OF_CONNECTION",
            UeProcedure::Sleep => "IDLE_MODE",
            UeProcedure::Paging => "PAGING",
            UeProcedure::HandoverSuccessful => "HO_SUCCESSFUL",
            UeProcedure::HandoverFailure => "HO_FAILED",
            UeProcedure::HandoverInitiated => "HO_INITIATED",
        };
        write!(f, "{s}")
    }
}

/// AMF exposure event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmfEventType {
    /// CM state change
    #[serde(rename = "CONNECTIVITY_STATE_REPORT")]
    ConnectivityStateReport,
    /// RM state change
    #[serde(rename = "REGISTRATION_STATE_REPORT")]
    RegistrationStateReport,
    /// Cell-level location report
    #[serde(rename = "LOCATION_REPORT")]
    LocationReport,
    /// UE unreachable
    #[serde(rename = "LOSS_OF_CONNECTIVITY")]
    LossOfConnectivity,
    /// Area population report (reserved, unused)
    #[serde(rename = "UES_IN_AREA_REPORT")]
    UesInAreaReport,
}

impl fmt::Display for AmfEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AmfEventType::ConnectivityStateReport => "CONNECTIVITY_STATE_REPORT",
            AmfEventType::RegistrationStateReport => "REGISTRATION_STATE_REPORT",
            AmfEventType::LocationReport => "LOCATION_REPORT",
            AmfEventType::LossOfConnectivity => "LOSS_OF_CONNECTIVITY",
            AmfEventType::UesInAreaReport => "UES_IN_AREA_REPORT",
        };
        write!(f, "{s}")
    }
}

/// SMF exposure event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmfEvent {
    /// PDU session established
    #[serde(rename = "PDU_SES_EST")]
    PduSesEst,
    /// PDU session released
    #[serde(rename = "PDU_SES_REL")]
    PduSesRel,
    /// Downlink data delivery status
    #[serde(rename = "DDDS")]
    Ddds,
    /// QoS monitoring report
    #[serde(rename = "QOS_MON")]
    QosMon,
    /// Communication failure
    #[serde(rename = "COMM_FAIL")]
    CommFail,
}

impl fmt::Display for SmfEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SmfEvent::PduSesEst => "PDU_SES_EST",
            SmfEvent::PduSesRel => "PDU_SES_REL",
            SmfEvent::Ddds => "DDDS",
            SmfEvent::QosMon => "QOS_MON",
            SmfEvent::CommFail => "COMM_FAIL",
        };
        write!(f, "{s}")
    }
}

/// PDU session address type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PduSessType {
    /// IPv4 session
    #[default]
    #[serde(rename = "IPV4")]
    Ipv4,
    /// IPv6 session
    #[serde(rename = "IPV6")]
    Ipv6,
    /// Dual-stack session
    #[serde(rename = "IPV4V6")]
    Ipv4v6,
}

/// Downlink data delivery status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DddStatus {
    /// Downlink data buffered
    #[serde(rename = "BUFFERED")]
    Buffered,
    /// Downlink data transmitted
    #[serde(rename = "TRANSMITTED")]
    Transmitted,
    /// Downlink data discarded
    #[serde(rename = "DISCARDED")]
    Discarded,
}

/// Reason attached to a loss-of-connectivity report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossOfConnectReason {
    /// UE deregistered
    #[serde(rename = "DEREGISTERED")]
    Deregistered,
    /// Maximum detection time expired
    #[serde(rename = "MAX_DETECTION_TIME_EXPIRED")]
    MaxDetectionTimeExpired,
    /// UE context purged
    #[serde(rename = "PURGED")]
    Purged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plmn_display() {
        let plmn = PlmnId::new("208", "95");
        assert_eq!(plmn.to_string(), "20895");
    }

    #[test]
    fn test_plmn_serde() {
        let plmn = PlmnId::new("001", "01");
        let json = serde_json::to_string(&plmn).unwrap();
        assert_eq!(json, r#"{"mcc":"001","mnc":"01"}"#);
        let parsed: PlmnId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plmn);
    }

    #[test]
    fn test_snssai_serde_skips_missing_sd() {
        let slice = Snssai { sst: 1, sd: None };
        assert_eq!(serde_json::to_string(&slice).unwrap(), r#"{"sst":1}"#);

        let slice = Snssai {
            sst: 1,
            sd: Some("000001".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&slice).unwrap(),
            r#"{"sst":1,"sd":"000001"}"#
        );
    }

    #[test]
    fn test_access_type_wire_value() {
        let json = serde_json::to_string(&AccessType::ThreeGppAccess).unwrap();
        assert_eq!(json, r#""3GPP_ACCESS""#);
    }

    #[test]
    fn test_rm_state_wire_value() {
        assert_eq!(
            serde_json::to_string(&RmState::Registered).unwrap(),
            r#""REGISTERED""#
        );
        assert_eq!(RmState::Deregistered.as_str(), "DEREGISTERED");
        assert_eq!(RmState::default(), RmState::Deregistered);
    }

    #[test]
    fn test_cm_state_wire_value() {
        assert_eq!(serde_json::to_string(&CmState::Idle).unwrap(), r#""IDLE""#);
        assert_eq!(CmState::default(), CmState::Idle);
    }

    #[test]
    fn test_amf_event_type_wire_values() {
        for (event, wire) in [
            (AmfEventType::ConnectivityStateReport, "CONNECTIVITY_STATE_REPORT"),
            (AmfEventType::RegistrationStateReport, "REGISTRATION_STATE_REPORT"),
            (AmfEventType::LocationReport, "LOCATION_REPORT"),
            (AmfEventType::LossOfConnectivity, "LOSS_OF_CONNECTIVITY"),
            (AmfEventType::UesInAreaReport, "UES_IN_AREA_REPORT"),
        ] {
            assert_eq!(
                serde_json::to_string(&event).unwrap(),
                format!("\"{wire}\"")
            );
            assert_eq!(event.to_string(), wire);
        }
    }

    #[test]
    fn test_smf_event_wire_values() {
        for (event, wire) in [
            (SmfEvent::PduSesEst, "PDU_SES_EST"),
            (SmfEvent::PduSesRel, "PDU_SES_REL"),
            (SmfEvent::Ddds, "DDDS"),
            (SmfEvent::QosMon, "QOS_MON"),
            (SmfEvent::CommFail, "COMM_FAIL"),
        ] {
            assert_eq!(
                serde_json::to_string(&event).unwrap(),
                format!("\"{wire}\"")
            );
        }
    }

    #[test]
    fn test_ue_state_default() {
        assert_eq!(UeState::default(), UeState::Deregistered);
    }

    #[test]
    fn test_ue_procedure_display() {
        assert_eq!(UeProcedure::PduSessionEstablishment.to_string(), "PDU_SES_EST");
        assert_eq!(UeProcedure::NoProcedure.to_string(), "NONE");
        assert_eq!(UeProcedure::Sleep.to_string(), "IDLE_MODE");
    }

    #[test]
    fn test_pdu_sess_type_wire_value() {
        assert_eq!(
            serde_json::to_string(&PduSessType::Ipv4).unwrap(),
            r#""IPV4""#
        );
    }
}
