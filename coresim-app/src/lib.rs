//! Simulator application: network instance, lifecycle controller and the
//! OAM and metrics HTTP surfaces.

pub mod controller;
pub mod metrics_server;
pub mod network;
pub mod oam;

pub use controller::{ControllerError, SimController, SimulationStatus};
pub use network::NetworkInstance;
pub use oam::{oam_router, OamState};
