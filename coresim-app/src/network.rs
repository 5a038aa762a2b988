//! Network instance
//!
//! One instance owns the three network functions, the IP pool, the cell
//! list, the SBI server and the arrival-driven UE population. Stopping
//! tears down the population but keeps the instance so a later start can
//! reuse it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

use coresim_common::config::NetworkConfig;
use coresim_common::error::Error;
use coresim_common::Runtime;
use coresim_core::{sbi_router, Amf, IpAllocator, Pcf, SbiState, Smf};
use coresim_ran::ue::{Ue, UeConfig};

/// Fixed UE address pool. Should become configurable, per slice, once
/// multi-slice profiles exist.
const UE_SUBNET: &str = "12.1.0.0/16";

/// NCI is 36 bits, so cell ids stop at 2^36 - 1.
const MAX_NCI: u64 = (1 << 36) - 1;

/// One simulated network with its UE population.
pub struct NetworkInstance {
    sim_id: String,
    sbi_port: u16,
    config: NetworkConfig,
    runtime: Runtime,
    ipam: Arc<IpAllocator>,
    amf: Arc<Amf>,
    smf: Arc<Smf>,
    pcf: Arc<Pcf>,
    cells: Arc<Vec<String>>,
    ues: Arc<Mutex<HashMap<String, Arc<Ue>>>>,
    ue_gen_cancel: Option<watch::Sender<bool>>,
    sbi_addr: Option<SocketAddr>,
}

impl NetworkInstance {
    /// Creates an instance for the given profile. The SBI server and the
    /// NF mailboxes are not live until [`NetworkInstance::init`].
    pub fn new(sbi_port: u16, config: NetworkConfig, runtime: Runtime) -> Result<Self, Error> {
        let ipam = Arc::new(
            IpAllocator::new(UE_SUBNET).map_err(|e| Error::Config(e.to_string()))?,
        );
        let amf = Arc::new(Amf::new(config.plmn.clone()));
        let smf = Arc::new(Smf::new(config.plmn.clone()));
        let pcf = Arc::new(Pcf::new(config.plmn.clone(), ipam.clone()));
        let cells = Arc::new(generate_nr_cell_ids(config.num_of_gnb));

        Ok(Self {
            sim_id: Uuid::new_v4().to_string(),
            sbi_port,
            config,
            runtime,
            ipam,
            amf,
            smf,
            pcf,
            cells,
            ues: Arc::new(Mutex::new(HashMap::new())),
            ue_gen_cancel: None,
            sbi_addr: None,
        })
    }

    /// Simulation identifier.
    pub fn sim_id(&self) -> &str {
        &self.sim_id
    }

    /// Address the SBI server is bound to, once initialized.
    pub fn sbi_addr(&self) -> Option<SocketAddr> {
        self.sbi_addr
    }

    /// Number of live UEs.
    pub async fn ue_count(&self) -> usize {
        self.ues.lock().await.len()
    }

    /// Starts the NF mailbox consumers and the SBI HTTP server.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.amf.spawn(&self.runtime)?;
        self.smf.spawn(&self.runtime)?;
        self.pcf.spawn(&self.runtime)?;

        let router = sbi_router(SbiState {
            amf: self.amf.clone(),
            smf: self.smf.clone(),
            pcf: self.pcf.clone(),
        });

        let listener = TcpListener::bind(("0.0.0.0", self.sbi_port)).await?;
        let addr = listener.local_addr()?;
        self.sbi_addr = Some(addr);
        info!("serving 3GPP sbi on {addr}");

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!("could not serve 3GPP sbi server: {e}");
            }
        });

        Ok(())
    }

    /// Starts the arrival process that populates the instance with UEs.
    pub async fn start(&mut self) -> Result<(), Error> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.ue_gen_cancel = Some(cancel_tx);
        info!("starting simulation {}", self.sim_id);

        let runtime = self.runtime.clone();
        let config = self.config.clone();
        let ipam = self.ipam.clone();
        let cells = self.cells.clone();
        let ues = self.ues.clone();
        let sim_id = self.sim_id.clone();
        tokio::spawn(generate_ues(
            runtime, config, ipam, cells, ues, sim_id, cancel_rx,
        ));

        Ok(())
    }

    /// Cancels UE generation and gracefully turns off every UE. The
    /// instance stays usable for a subsequent start.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.ue_gen_cancel.take() {
            cancel.send_replace(true);
        }

        let mut ues = self.ues.lock().await;
        for (_, ue) in ues.drain() {
            ue.turn_off(true).await;
        }
    }
}

/// Spawns `num_of_ue` UEs at exponentially distributed inter-arrival times.
async fn generate_ues(
    runtime: Runtime,
    config: NetworkConfig,
    ipam: Arc<IpAllocator>,
    cells: Arc<Vec<String>>,
    ues: Arc<Mutex<HashMap<String, Arc<Ue>>>>,
    sim_id: String,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut rng = StdRng::from_entropy();

    for i in 0..config.num_of_ue {
        let wait = exp_interarrival(&mut rng, config.arrival_rate);
        tokio::select! {
            res = cancel_rx.changed() => {
                if res.is_err() || *cancel_rx.borrow() {
                    return;
                }
            }
            _ = sleep(wait) => {}
        }

        let supi = format!(
            "{}{}00000{:05}",
            config.plmn.mcc,
            config.plmn.mnc,
            i + 1
        );
        let msisdn = format!("+336{:09}", 100_000_000 + u64::from(i));
        let imei = generate_imei(&mut rng);

        let ue = Ue::new(
            UeConfig {
                supi: supi.clone(),
                msisdn,
                imei,
                dnn: config.dnn.clone(),
                snssai: config.snssai.clone(),
                profile: "Smartphone".to_string(),
                plmn: config.plmn.clone(),
            },
            ipam.clone(),
            runtime.clone(),
            sim_id.clone(),
            cells.clone(),
        );

        ue.power_up().await;
        ues.lock().await.insert(supi, ue);
    }
}

/// Draws an exponential inter-arrival time with rate `lambda` per second.
pub fn exp_interarrival(rng: &mut impl Rng, lambda: f64) -> Duration {
    if lambda <= 0.0 {
        return Duration::ZERO;
    }
    let u: f64 = rng.gen();
    Duration::from_secs_f64(-(1.0 - u).ln() / lambda)
}

/// Generates a random IMEI: 8-digit TAC, 6-digit SNR, Luhn check digit.
pub fn generate_imei(rng: &mut impl Rng) -> String {
    let tac = format!("{:08}", rng.gen_range(0..100_000_000u64));
    let snr = format!("{:06}", rng.gen_range(0..1_000_000u64));
    let imei14 = format!("{tac}{snr}");
    let check = luhn_check_digit(&imei14);
    format!("{imei14}{check}")
}

/// Luhn check digit of a numeric string, doubling from the rightmost digit.
pub fn luhn_check_digit(number: &str) -> u32 {
    let mut sum = 0u32;
    let mut double = true;
    for c in number.chars().rev() {
        let mut n = c.to_digit(10).unwrap_or(0);
        if double {
            n *= 2;
            if n > 9 {
                n -= 9;
            }
        }
        sum += n;
        double = !double;
    }
    (10 - (sum % 10)) % 10
}

/// Generates `max` NR cell identities as lowercase zero-padded 9-hex-digit
/// strings, capped at the 36-bit NCI space.
pub fn generate_nr_cell_ids(max: u64) -> Vec<String> {
    let max = max.min(MAX_NCI);
    (0..max).map(|i| format!("{i:09x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard Luhn validation over a full digit string including its
    /// check digit: doubling every second digit from the right must give a
    /// multiple of ten.
    fn luhn_valid(number: &str) -> bool {
        let mut sum = 0u32;
        let mut double = false;
        for c in number.chars().rev() {
            let mut n = match c.to_digit(10) {
                Some(n) => n,
                None => return false,
            };
            if double {
                n *= 2;
                if n > 9 {
                    n -= 9;
                }
            }
            sum += n;
            double = !double;
        }
        sum % 10 == 0
    }

    #[test]
    fn test_luhn_known_vector() {
        // 490154203237518 is the classic valid IMEI example.
        assert_eq!(luhn_check_digit("49015420323751"), 8);
        assert!(luhn_valid("490154203237518"));
    }

    #[test]
    fn test_generated_imei_is_valid() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let imei = generate_imei(&mut rng);
            assert_eq!(imei.len(), 15);
            assert!(imei.chars().all(|c| c.is_ascii_digit()));
            assert!(luhn_valid(&imei), "invalid IMEI {imei}");
        }
    }

    #[test]
    fn test_cell_ids_format_and_distinct() {
        let cells = generate_nr_cell_ids(300);
        assert_eq!(cells.len(), 300);

        let mut seen = std::collections::HashSet::new();
        for cell in &cells {
            assert_eq!(cell.len(), 9);
            assert!(cell.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert!(seen.insert(cell.clone()), "duplicate cell {cell}");
        }
        assert_eq!(cells[0], "000000000");
        assert_eq!(cells[255], "0000000ff");
    }

    #[test]
    fn test_cell_ids_capped_at_nci_space() {
        // Asking beyond the 36-bit space is clamped, not overflowed. The
        // cap itself is too large to materialize, so check the clamp value.
        assert_eq!(u64::MAX.min(MAX_NCI), MAX_NCI);
        assert_eq!(1000u64.min(MAX_NCI), 1000);
    }

    #[test]
    fn test_exponential_interarrival_mean() {
        let mut rng = StdRng::seed_from_u64(99);
        let lambda = 10.0;
        let n = 10_000;
        let total: f64 = (0..n)
            .map(|_| exp_interarrival(&mut rng, lambda).as_secs_f64())
            .sum();
        let mean = total / n as f64;
        assert!((mean - 0.1).abs() < 0.005, "mean {mean}");
    }

    #[test]
    fn test_exponential_interarrival_zero_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(exp_interarrival(&mut rng, 0.0), Duration::ZERO);
    }

    #[test]
    fn test_supi_format() {
        let supi = format!("{}{}00000{:05}", "208", "95", 1);
        assert_eq!(supi, "208950000000001");
        assert_eq!(supi.len(), 15);
    }

    #[test]
    fn test_msisdn_format() {
        let msisdn = format!("+336{:09}", 100_000_000 + 2u64);
        assert_eq!(msisdn, "+336100000002");
    }
}
