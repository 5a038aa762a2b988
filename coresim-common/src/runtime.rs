//! Shared runtime handle
//!
//! Components receive a `Runtime` instead of reaching for process-wide
//! globals: the event bus and the metrics handles travel together.

use std::sync::Arc;

use crate::bus::Bus;
use crate::error::Error;
use crate::metrics::SimMetrics;

/// Handle carrying the process services every component needs.
#[derive(Clone)]
pub struct Runtime {
    /// Named-mailbox event bus
    pub bus: Bus,
    /// Prometheus metric handles
    pub metrics: Arc<SimMetrics>,
}

impl Runtime {
    /// Creates a fresh runtime with an empty bus and registered metrics.
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            bus: Bus::new(),
            metrics: Arc::new(SimMetrics::new()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runtime_clone_shares_bus() {
        let runtime = Runtime::new().unwrap();
        let clone = runtime.clone();
        runtime.bus.start_task("AMF", 4, |_| async {}).unwrap();
        assert!(clone.bus.has_task("AMF"));
    }
}
