//! Prometheus metrics for the simulator
//!
//! One `SimMetrics` instance per process, carried inside the runtime handle.
//! Metric names and label sets are part of the external contract.

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Direction label value for uplink traffic.
pub const DIR_UL: &str = "UL";
/// Direction label value for downlink traffic.
pub const DIR_DL: &str = "DL";

/// Simulator metric handles backed by a private registry.
pub struct SimMetrics {
    registry: Registry,
    /// `ue_total{simulationId,state}`
    pub ues_total: IntGaugeVec,
    /// `pdu_sessions_total{simulationId}`
    pub pdu_sessions_total: IntGaugeVec,
    /// `ue_ip_info{simulationId,imsi,ip}`
    pub ue_ip_info: IntGaugeVec,
    /// `ue_traffic_bytes_total{simulationId,ueId,direction}`
    pub traffic_bytes: IntCounterVec,
    /// `ue_traffic_packets_total{simulationId,ueId,direction}`
    pub traffic_packets: IntCounterVec,
    /// `total_traffic_bytes_total{simulationId,direction}`
    pub total_traffic: IntCounterVec,
}

impl SimMetrics {
    /// Creates and registers all simulator metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let ues_total = IntGaugeVec::new(
            Opts::new("ue_total", "Total number of UEs by state"),
            &["simulationId", "state"],
        )?;
        let pdu_sessions_total = IntGaugeVec::new(
            Opts::new("pdu_sessions_total", "Number of active PDU sessions"),
            &["simulationId"],
        )?;
        let ue_ip_info = IntGaugeVec::new(
            Opts::new("ue_ip_info", "UE metadata mapping IMSI to IP address"),
            &["simulationId", "imsi", "ip"],
        )?;
        let traffic_bytes = IntCounterVec::new(
            Opts::new("ue_traffic_bytes_total", "Total traffic bytes by direction"),
            &["simulationId", "ueId", "direction"],
        )?;
        let traffic_packets = IntCounterVec::new(
            Opts::new(
                "ue_traffic_packets_total",
                "Total traffic packets by direction",
            ),
            &["simulationId", "ueId", "direction"],
        )?;
        let total_traffic = IntCounterVec::new(
            Opts::new(
                "total_traffic_bytes_total",
                "Aggregate traffic bytes by direction",
            ),
            &["simulationId", "direction"],
        )?;

        registry.register(Box::new(ues_total.clone()))?;
        registry.register(Box::new(pdu_sessions_total.clone()))?;
        registry.register(Box::new(ue_ip_info.clone()))?;
        registry.register(Box::new(traffic_bytes.clone()))?;
        registry.register(Box::new(traffic_packets.clone()))?;
        registry.register(Box::new(total_traffic.clone()))?;

        Ok(Self {
            registry,
            ues_total,
            pdu_sessions_total,
            ue_ip_info,
            traffic_bytes,
            traffic_packets,
            total_traffic,
        })
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let families = self.registry.gather();
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&families, &mut buf) {
            tracing::error!("could not encode metrics: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
