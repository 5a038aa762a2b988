//! Statistical traffic generators
//!
//! Purely statistical packet sources: no payloads, only sizes and pacing.
//! Each profile models one application class. Generators are polled by the
//! UE traffic loop and answer with a packet when their pacing allows one.

use std::time::{Duration, Instant};

use tracing::warn;

/// A packet emission event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    /// Packet size in bytes
    pub size_bytes: usize,
    /// Emission time
    pub timestamp: Instant,
}

/// A statistical packet source.
pub trait TrafficGenerator: Send {
    /// Emits the next packet, or None if the pacing allows none at `now`.
    fn next_packet(&mut self, now: Instant) -> Option<Packet>;
}

/// Bursty HTTP-like traffic alternating bursts and idle periods.
pub struct WebTraffic {
    avg_bitrate: f64,
    packet_size: usize,
    burst_duration: Duration,
    idle_duration: Duration,
    last_packet: Option<Instant>,
    phase_end: Option<Instant>,
    in_burst: bool,
}

impl WebTraffic {
    /// Creates a web generator with the given burst bitrate and packet size.
    pub fn new(bitrate: f64, packet_size: usize, burst: Duration, idle: Duration) -> Self {
        Self {
            avg_bitrate: bitrate,
            packet_size,
            burst_duration: burst,
            idle_duration: idle,
            last_packet: None,
            phase_end: None,
            in_burst: true,
        }
    }
}

impl TrafficGenerator for WebTraffic {
    fn next_packet(&mut self, now: Instant) -> Option<Packet> {
        if self.phase_end.map_or(true, |end| now > end) {
            self.in_burst = !self.in_burst;
            self.phase_end = Some(if self.in_burst {
                now + self.burst_duration
            } else {
                now + self.idle_duration
            });
        }

        if !self.in_burst {
            return None;
        }

        let interval =
            Duration::from_secs_f64(self.packet_size as f64 * 8.0 / self.avg_bitrate);
        let due = self
            .last_packet
            .map_or(true, |last| now.duration_since(last) >= interval);
        if due {
            self.last_packet = Some(now);
            Some(Packet {
                size_bytes: self.packet_size,
                timestamp: now,
            })
        } else {
            None
        }
    }
}

/// Steady video streaming traffic.
pub struct VideoTraffic {
    packet_size: usize,
    interval: Duration,
    last_packet: Option<Instant>,
}

impl VideoTraffic {
    /// Creates a video generator pacing `bitrate` with fixed-size packets.
    pub fn new(bitrate: f64, packet_size: usize) -> Self {
        let pkt_per_sec = bitrate / (packet_size as f64 * 8.0);
        Self {
            packet_size,
            interval: Duration::from_secs_f64(1.0 / pkt_per_sec),
            last_packet: None,
        }
    }
}

impl TrafficGenerator for VideoTraffic {
    fn next_packet(&mut self, now: Instant) -> Option<Packet> {
        let due = self
            .last_packet
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_packet = Some(now);
            Some(Packet {
                size_bytes: self.packet_size,
                timestamp: now,
            })
        } else {
            None
        }
    }
}

/// Periodic heartbeat traffic from IoT devices.
pub struct IotTraffic {
    packet_size: usize,
    heartbeat_interval: Duration,
    last_packet: Option<Instant>,
}

impl IotTraffic {
    /// Creates an IoT generator emitting one packet per interval.
    pub fn new(packet_size: usize, interval: Duration) -> Self {
        Self {
            packet_size,
            heartbeat_interval: interval,
            last_packet: None,
        }
    }
}

impl TrafficGenerator for IotTraffic {
    fn next_packet(&mut self, now: Instant) -> Option<Packet> {
        let due = self
            .last_packet
            .map_or(true, |last| now.duration_since(last) >= self.heartbeat_interval);
        if due {
            self.last_packet = Some(now);
            Some(Packet {
                size_bytes: self.packet_size,
                timestamp: now,
            })
        } else {
            None
        }
    }
}

/// Voice traffic with small, steady packets.
pub struct VoipTraffic {
    packet_size: usize,
    interval: Duration,
    last_packet: Option<Instant>,
}

impl VoipTraffic {
    /// Creates a VoIP generator emitting `packet_rate` packets per second.
    pub fn new(packet_size: usize, packet_rate: f64) -> Self {
        Self {
            packet_size,
            interval: Duration::from_secs_f64(1.0 / packet_rate),
            last_packet: None,
        }
    }
}

impl TrafficGenerator for VoipTraffic {
    fn next_packet(&mut self, now: Instant) -> Option<Packet> {
        let due = self
            .last_packet
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if due {
            self.last_packet = Some(now);
            Some(Packet {
                size_bytes: self.packet_size,
                timestamp: now,
            })
        } else {
            None
        }
    }
}

/// Builds the generator for a profile name.
///
/// Unknown profiles fall back to a short-burst web generator.
pub fn by_profile(supi: &str, profile: &str) -> Box<dyn TrafficGenerator> {
    match profile {
        "web" => Box::new(WebTraffic::new(
            2e6,
            1200,
            Duration::from_secs(20),
            Duration::from_secs(40),
        )),
        "video" => Box::new(VideoTraffic::new(8e6, 1300)),
        "iot" => Box::new(IotTraffic::new(1000, Duration::from_secs(15))),
        "sip" => Box::new(VoipTraffic::new(600, 50.0)),
        other => {
            warn!("[{supi}] unknown traffic profile {other}, using default web traffic");
            Box::new(WebTraffic::new(
                2e6,
                1200,
                Duration::from_secs(6),
                Duration::from_secs(10),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_paces_by_interval() {
        let mut gen = VideoTraffic::new(8e6, 1300);
        let t0 = Instant::now();

        let first = gen.next_packet(t0).unwrap();
        assert_eq!(first.size_bytes, 1300);

        // Too soon for another packet.
        assert!(gen.next_packet(t0 + Duration::from_micros(100)).is_none());

        // 8 Mb/s with 1300-byte packets is one packet every 1.3 ms.
        assert!(gen.next_packet(t0 + Duration::from_micros(1400)).is_some());
    }

    #[test]
    fn test_iot_heartbeat() {
        let mut gen = IotTraffic::new(1000, Duration::from_secs(15));
        let t0 = Instant::now();

        assert!(gen.next_packet(t0).is_some());
        assert!(gen.next_packet(t0 + Duration::from_secs(10)).is_none());
        assert!(gen.next_packet(t0 + Duration::from_secs(15)).is_some());
    }

    #[test]
    fn test_voip_rate() {
        let mut gen = VoipTraffic::new(600, 50.0);
        let t0 = Instant::now();

        let pkt = gen.next_packet(t0).unwrap();
        assert_eq!(pkt.size_bytes, 600);

        // 50 pps is one packet every 20 ms.
        assert!(gen.next_packet(t0 + Duration::from_millis(10)).is_none());
        assert!(gen.next_packet(t0 + Duration::from_millis(20)).is_some());
    }

    #[test]
    fn test_web_starts_in_idle_phase() {
        // The first poll toggles the phase, so a fresh generator sits idle
        // for the idle duration before its first burst.
        let mut gen = WebTraffic::new(
            2e6,
            1200,
            Duration::from_secs(20),
            Duration::from_secs(40),
        );
        let t0 = Instant::now();
        assert!(gen.next_packet(t0).is_none());

        // Still inside the idle window.
        assert!(gen.next_packet(t0 + Duration::from_secs(39)).is_none());

        // Past the idle window the generator bursts.
        assert!(gen.next_packet(t0 + Duration::from_secs(41)).is_some());
    }

    #[test]
    fn test_web_burst_paces_packets() {
        let mut gen = WebTraffic::new(
            2e6,
            1200,
            Duration::from_secs(20),
            Duration::from_millis(1),
        );
        let t0 = Instant::now();
        assert!(gen.next_packet(t0).is_none());

        // Burst begins after the 1 ms idle phase.
        let t1 = t0 + Duration::from_millis(2);
        assert!(gen.next_packet(t1).is_some());

        // 2 Mb/s with 1200-byte packets is one packet every 4.8 ms.
        assert!(gen.next_packet(t1 + Duration::from_millis(1)).is_none());
        assert!(gen.next_packet(t1 + Duration::from_millis(5)).is_some());
    }

    #[test]
    fn test_profile_lookup() {
        // Known and unknown profiles both produce a working generator.
        for profile in ["web", "video", "iot", "sip", "bogus"] {
            let mut gen = by_profile("001010000000001", profile);
            let mut t = Instant::now();
            let mut emitted = false;
            for _ in 0..200_000 {
                if gen.next_packet(t).is_some() {
                    emitted = true;
                    break;
                }
                t += Duration::from_millis(1);
            }
            assert!(emitted, "profile {profile} never emitted");
        }
    }
}
