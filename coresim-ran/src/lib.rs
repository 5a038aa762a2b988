//! Radio-access side of coresim
//!
//! This crate drives the synthetic UE population: the per-UE Markov engine,
//! the statistical traffic generators and the UE actor that turns Markov
//! transitions into signalling procedures and bus events.

pub mod markov;
pub mod traffic;
pub mod ue;

pub use markov::next_state;
pub use traffic::{Packet, TrafficGenerator};
pub use ue::{Ue, UeConfig};
