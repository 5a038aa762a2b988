//! Common types and utilities for coresim
//!
//! This crate provides the shared vocabulary of the simulator: 5G identity
//! and state types, the internal event bus, inter-component messages,
//! per-session usage counters, configuration structures, metrics handles
//! and logging setup used across all coresim crates.

pub mod bus;
pub mod config;
pub mod error;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod runtime;
pub mod types;
pub mod up_stats;

pub use bus::{Bus, BusError, BusMessage, DEFAULT_MAILBOX_CAPACITY};
pub use config::{AppConfig, NetworkConfig};
pub use error::Error;
pub use logging::{init_logging, init_logging_with_filter, LogLevel};
pub use messages::{BusPayload, UeToAmfMsg, UeToSmfMsg};
pub use metrics::SimMetrics;
pub use runtime::Runtime;
pub use types::*;
pub use up_stats::{UpStats, UpStatsReport};
