//! Core network functions for coresim
//!
//! This crate implements the simulated 5G core side: the IP allocator, the
//! AMF, SMF and PCF network functions with their subscription registries and
//! HTTP notification fan-out, and the service-based-interface router that
//! exposes their northbound APIs.

pub mod amf;
pub mod ipam;
pub mod notifications;
mod notify;
pub mod pcf;
pub mod sbi;
pub mod smf;

pub use amf::Amf;
pub use ipam::{IpAllocator, IpamError};
pub use pcf::Pcf;
pub use sbi::{sbi_router, SbiState};
pub use smf::Smf;
