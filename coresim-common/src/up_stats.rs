//! Per-session user-plane usage counters
//!
//! Each PDU session with reporting enabled carries an `UpStats` record; the
//! periodic QoS reporter derives an `UpStatsReport` from it.

use std::time::{Duration, Instant};

/// Minimum elapsed time used in rate computations. Packets arriving
/// back-to-back would otherwise divide by a near-zero age.
const MIN_RATE_WINDOW: Duration = Duration::from_millis(1);

/// Cumulative user-plane counters for one PDU session.
#[derive(Debug, Clone)]
pub struct UpStats {
    /// PDU session the counters belong to
    pub pdu_sess_id: i32,
    /// Total packets in both directions
    pub num_of_packets: i64,
    /// Total bytes in both directions
    pub total_bytes: i64,
    /// Uplink packet count
    pub num_ul_packets: i64,
    /// Downlink packet count
    pub num_dl_packets: i64,
    /// Uplink byte total
    pub total_ul_bytes: i64,
    /// Downlink byte total
    pub total_dl_bytes: i64,
    /// Arrival time of the last uplink packet
    pub last_ul_update: Instant,
    /// Arrival time of the last downlink packet
    pub last_dl_update: Instant,
    /// Size of the last uplink packet
    pub last_ul_size: i64,
    /// Size of the last downlink packet
    pub last_dl_size: i64,
}

/// Snapshot of `UpStats` extended with instantaneous rates.
#[derive(Debug, Clone)]
pub struct UpStatsReport {
    /// Counters at report time
    pub stats: UpStats,
    /// Uplink bitrate in bits per second
    pub ul_bitrate: f64,
    /// Downlink bitrate in bits per second
    pub dl_bitrate: f64,
    /// Uplink packet rate in packets per second
    pub ul_packet_rate: f64,
    /// Downlink packet rate in packets per second
    pub dl_packet_rate: f64,
}

impl UpStats {
    /// Creates zeroed counters for the given session.
    pub fn new(session_id: i32) -> Self {
        let now = Instant::now();
        Self {
            pdu_sess_id: session_id,
            num_of_packets: 0,
            total_bytes: 0,
            num_ul_packets: 0,
            num_dl_packets: 0,
            total_ul_bytes: 0,
            total_dl_bytes: 0,
            last_ul_update: now,
            last_dl_update: now,
            last_ul_size: 0,
            last_dl_size: 0,
        }
    }

    /// Accounts one packet in the given direction.
    pub fn new_packet(&mut self, uplink: bool, size: i64, timestamp: Instant) {
        self.num_of_packets += 1;
        self.total_bytes += size;
        if uplink {
            self.num_ul_packets += 1;
            self.total_ul_bytes += size;
            self.last_ul_size = size;
            self.last_ul_update = timestamp;
        } else {
            self.num_dl_packets += 1;
            self.total_dl_bytes += size;
            self.last_dl_size = size;
            self.last_dl_update = timestamp;
        }
    }

    /// Builds a rate report from the last packet in each direction and its
    /// age at `now`.
    pub fn report(&self, now: Instant) -> UpStatsReport {
        let ul_elapsed = now
            .saturating_duration_since(self.last_ul_update)
            .max(MIN_RATE_WINDOW)
            .as_secs_f64();
        let dl_elapsed = now
            .saturating_duration_since(self.last_dl_update)
            .max(MIN_RATE_WINDOW)
            .as_secs_f64();

        UpStatsReport {
            stats: self.clone(),
            ul_bitrate: self.last_ul_size as f64 / ul_elapsed * 8.0,
            dl_bitrate: self.last_dl_size as f64 / dl_elapsed * 8.0,
            ul_packet_rate: 1.0 / ul_elapsed,
            dl_packet_rate: 1.0 / dl_elapsed,
        }
    }
}

impl std::fmt::Display for UpStatsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SessionId: {}, Packets: {}, Bytes: {}, Ul Bitrate: {:.2} bps, Ul Packet Rate: {:.2} pps, Dl Bitrate: {:.2} bps, Dl Packet Rate: {:.2} pps",
            self.stats.pdu_sess_id,
            self.stats.num_of_packets,
            self.stats.total_bytes,
            self.ul_bitrate,
            self.ul_packet_rate,
            self.dl_bitrate,
            self.dl_packet_rate,
        )
    }
}
