//! Configuration structures for the simulator
//!
//! The application configuration is read from a YAML file at startup; the
//! simulation profile inside it can also arrive later through the OAM
//! configure endpoint as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{PlmnId, Snssai};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// HTTP version for the SBI listener (2 for h2c)
    pub http_version: u16,
    /// Whether the SBI listener uses TLS
    #[serde(rename = "useTLS")]
    pub use_tls: bool,
    /// Fully qualified domain name advertised by the simulator
    pub fqdn: String,
    /// Port of the 3GPP service-based interface
    pub sbi_port: u16,
    /// Port of the OAM interface
    pub oam_port: u16,
    /// Whether a simulation instance is configured at startup
    pub init_on_startup: bool,
    /// Simulation profile, required when `init_on_startup` is set
    #[serde(rename = "simulationProfile")]
    pub net_config: Option<NetworkConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_version: 2,
            use_tls: false,
            fqdn: "coresim.local".to_string(),
            sbi_port: 8080,
            oam_port: 8081,
            init_on_startup: false,
            net_config: None,
        }
    }
}

/// Configuration of one simulated network instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network slice served by the instance
    #[serde(rename = "slice")]
    pub snssai: Snssai,
    /// Operator PLMN
    pub plmn: PlmnId,
    /// Data network name for default sessions
    pub dnn: String,
    /// Number of synthetic cells
    #[serde(rename = "numOfgNB")]
    pub num_of_gnb: u64,
    /// UE population size
    #[serde(rename = "numOfUe")]
    pub num_of_ue: u32,
    /// Arrival rate of the UE generation process (UEs per second)
    #[serde(rename = "arrivalRate")]
    pub arrival_rate: f64,
}

impl AppConfig {
    /// Parses an application configuration from a YAML string.
    ///
    /// Fails when `initOnStartup` is set without a `simulationProfile`.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let cfg: AppConfig = serde_yaml::from_str(yaml)?;
        if cfg.init_on_startup && cfg.net_config.is_none() {
            return Err(Error::Config(
                "when initializing from startup, simulation profile must be defined in config file"
                    .to_string(),
            ));
        }
        Ok(cfg)
    }

    /// Loads an application configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Serializes the configuration to a YAML string.
    pub fn to_yaml(&self) -> Result<String, Error> {
        Ok(serde_yaml::to_string(self)?)
    }
}
