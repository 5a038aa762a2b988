//! Simulation lifecycle controller
//!
//! One controller per process. It owns the current network instance and a
//! CONFIGURED/STARTED/STOPPED/ERROR state machine guarded by a single lock.
//! A stopped instance is retained so a later start reuses it.

use std::net::SocketAddr;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use coresim_common::config::NetworkConfig;
use coresim_common::Runtime;

use crate::network::NetworkInstance;

/// Lifecycle state of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationStatus {
    /// No simulation is running
    #[serde(rename = "STOPPED")]
    Stopped,
    /// An instance is initialized and ready to start
    #[serde(rename = "CONFIGURED")]
    Configured,
    /// The UE population is live
    #[serde(rename = "STARTED")]
    Started,
    /// The last transition failed
    #[serde(rename = "ERROR")]
    Error,
}

impl std::fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SimulationStatus::Stopped => "STOPPED",
            SimulationStatus::Configured => "CONFIGURED",
            SimulationStatus::Started => "STARTED",
            SimulationStatus::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// Errors surfaced by lifecycle transitions.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Configure was called while an instance already exists.
    #[error("could not initialize the simulation instance, please stop or reset the current instance")]
    AlreadyConfigured,

    /// Start was called before configure.
    #[error("please configure the simulation via /configure")]
    NotConfigured,

    /// Stop was called while nothing is running.
    #[error("no running instance")]
    NoRunningInstance,

    /// Instance construction or initialization failed.
    #[error("could not initialize the simulation instance: {0}")]
    InitFailed(#[source] coresim_common::Error),

    /// Instance start failed.
    #[error("could not start the simulation instance")]
    StartFailed(#[source] coresim_common::Error),
}

struct ControllerInner {
    status: SimulationStatus,
    instance: Option<NetworkInstance>,
}

/// Top-level simulation controller.
pub struct SimController {
    sbi_port: u16,
    runtime: Runtime,
    inner: Mutex<ControllerInner>,
}

impl SimController {
    /// Creates a controller with no instance.
    pub fn new(sbi_port: u16, runtime: Runtime) -> Self {
        Self {
            sbi_port,
            runtime,
            inner: Mutex::new(ControllerInner {
                status: SimulationStatus::Stopped,
                instance: None,
            }),
        }
    }

    /// Builds and initializes a new instance. Only valid while no instance
    /// exists.
    pub async fn configure(
        &self,
        config: NetworkConfig,
    ) -> Result<SimulationStatus, ControllerError> {
        let mut inner = self.inner.lock().await;

        if inner.instance.is_some() {
            return Err(ControllerError::AlreadyConfigured);
        }

        let mut instance = NetworkInstance::new(self.sbi_port, config, self.runtime.clone())
            .map_err(ControllerError::InitFailed)?;
        instance
            .init()
            .await
            .map_err(ControllerError::InitFailed)?;

        inner.instance = Some(instance);
        inner.status = SimulationStatus::Configured;
        Ok(inner.status)
    }

    /// Starts the instance. From STARTED this is a restart: the running
    /// population is stopped first, best effort.
    pub async fn start(&self) -> Result<SimulationStatus, ControllerError> {
        let mut inner = self.inner.lock().await;

        let status = inner.status;
        let Some(instance) = inner.instance.as_mut() else {
            return Err(ControllerError::NotConfigured);
        };

        if status == SimulationStatus::Started {
            warn!("restarting a running instance");
            instance.stop().await;
        }

        match instance.start().await {
            Ok(()) => {
                inner.status = SimulationStatus::Started;
                Ok(inner.status)
            }
            Err(e) => {
                inner.status = SimulationStatus::Error;
                Err(ControllerError::StartFailed(e))
            }
        }
    }

    /// Stops the running instance, keeping it for a later start.
    pub async fn stop(&self) -> Result<SimulationStatus, ControllerError> {
        let mut inner = self.inner.lock().await;

        if inner.status != SimulationStatus::Started {
            return Err(ControllerError::NoRunningInstance);
        }
        let Some(instance) = inner.instance.as_mut() else {
            return Err(ControllerError::NoRunningInstance);
        };

        instance.stop().await;
        inner.status = SimulationStatus::Stopped;
        Ok(inner.status)
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> SimulationStatus {
        self.inner.lock().await.status
    }

    /// SBI address of the current instance, if configured.
    pub async fn sbi_addr(&self) -> Option<SocketAddr> {
        self.inner
            .lock()
            .await
            .instance
            .as_ref()
            .and_then(NetworkInstance::sbi_addr)
    }

    /// Number of live UEs in the current instance.
    pub async fn ue_count(&self) -> usize {
        match self.inner.lock().await.instance.as_ref() {
            Some(instance) => instance.ue_count().await,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coresim_common::types::{PlmnId, Snssai};

    fn profile(num_of_ue: u32) -> NetworkConfig {
        NetworkConfig {
            snssai: Snssai { sst: 1, sd: Some("000001".to_string()) },
            plmn: PlmnId::new("208", "95"),
            dnn: "internet".to_string(),
            num_of_gnb: 4,
            num_of_ue,
            arrival_rate: 100.0,
        }
    }

    fn controller() -> SimController {
        // Port 0 binds an ephemeral SBI port per test.
        SimController::new(0, Runtime::new().unwrap())
    }

    #[tokio::test]
    async fn test_initial_status_is_stopped() {
        let controller = controller();
        assert_eq!(controller.status().await, SimulationStatus::Stopped);
    }

    #[tokio::test]
    async fn test_configure_then_start_then_stop() {
        let controller = controller();

        let status = controller.configure(profile(0)).await.unwrap();
        assert_eq!(status, SimulationStatus::Configured);
        assert!(controller.sbi_addr().await.is_some());

        let status = controller.start().await.unwrap();
        assert_eq!(status, SimulationStatus::Started);

        let status = controller.stop().await.unwrap();
        assert_eq!(status, SimulationStatus::Stopped);
    }

    #[tokio::test]
    async fn test_start_requires_configure() {
        let controller = controller();
        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, ControllerError::NotConfigured));
    }

    #[tokio::test]
    async fn test_configure_twice_is_rejected() {
        let controller = controller();
        controller.configure(profile(0)).await.unwrap();
        let err = controller.configure(profile(0)).await.unwrap_err();
        assert!(matches!(err, ControllerError::AlreadyConfigured));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_rejected() {
        let controller = controller();
        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, ControllerError::NoRunningInstance));

        controller.configure(profile(0)).await.unwrap();
        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, ControllerError::NoRunningInstance));
    }

    #[tokio::test]
    async fn test_restart_from_started() {
        let controller = controller();
        controller.configure(profile(0)).await.unwrap();
        controller.start().await.unwrap();

        // Start from STARTED stops first, then starts again.
        let status = controller.start().await.unwrap();
        assert_eq!(status, SimulationStatus::Started);
    }

    #[tokio::test]
    async fn test_stop_then_start_reuses_instance() {
        let controller = controller();
        controller.configure(profile(0)).await.unwrap();
        let addr = controller.sbi_addr().await.unwrap();

        controller.start().await.unwrap();
        controller.stop().await.unwrap();
        controller.start().await.unwrap();

        assert_eq!(controller.status().await, SimulationStatus::Started);
        assert_eq!(controller.sbi_addr().await, Some(addr));
    }
}
