//! UE actor
//!
//! One `Ue` owns its identity, RM/CM state, PDU sessions and usage counters.
//! A 1 Hz ticker rolls the Markov chain and executes the drawn procedure;
//! traffic loops, the inactivity monitor and per-session QoS reporters run
//! as child tasks under the UE cancellation scope. All state mutation goes
//! through the UE lock; bus consumers only ever see snapshots.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{interval_at, sleep};
use tracing::{debug, info, warn};

use coresim_common::bus::DEFAULT_MAILBOX_CAPACITY;
use coresim_common::messages::{BusPayload, UeToAmfMsg, UeToSmfMsg};
use coresim_common::metrics::{DIR_DL, DIR_UL};
use coresim_common::types::{
    AccessType, AmfEventType, CmState, PduSessType, PlmnId, RmState, SmfEvent, Snssai, UeProcedure,
    UeState,
};
use coresim_common::up_stats::{UpStats, UpStatsReport};
use coresim_common::Runtime;
use coresim_core::ipam::IpAllocator;

use crate::markov;
use crate::traffic;

/// Markov tick period.
const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Inactivity timer armed at attach.
const INACTIVITY_TIMER: Duration = Duration::from_secs(10);
/// Period of the per-session QoS reporter.
const QOS_REPORT_PERIOD: Duration = Duration::from_secs(5);
/// Poll period of the traffic loops.
const TRAFFIC_POLL_PERIOD: Duration = Duration::from_millis(1);
/// Session id used by the ticker procedures.
const DEFAULT_PDU_SESSION_ID: i32 = 1;

/// Static configuration of one UE.
#[derive(Debug, Clone)]
pub struct UeConfig {
    /// Subscription permanent identifier (15 digits)
    pub supi: String,
    /// MSISDN in E.164 format
    pub msisdn: String,
    /// Equipment identity with Luhn check digit
    pub imei: String,
    /// Default data network name
    pub dnn: String,
    /// Default slice
    pub snssai: Snssai,
    /// Profile tag
    pub profile: String,
    /// Operator PLMN
    pub plmn: PlmnId,
}

/// One established PDU session.
#[derive(Debug, Clone)]
pub struct PduSession {
    /// Session id
    pub id: i32,
    /// Allocated UE address
    pub ipv4: Ipv4Addr,
    /// Data network name
    pub dnn: String,
    /// Slice
    pub snssai: Snssai,
    cancel: watch::Sender<bool>,
}

#[derive(Debug)]
struct UeStatus {
    ue_state: UeState,
    rm_state: RmState,
    cm_state: CmState,
    current_cell_id: String,
    sessions: HashMap<i32, PduSession>,
    last_activity: Instant,
}

/// A simulated User Equipment.
pub struct Ue {
    supi: String,
    msisdn: String,
    imei: String,
    plmn: PlmnId,
    profile: String,
    default_dnn: String,
    default_snssai: Snssai,
    access_type: AccessType,
    sim_id: String,
    cells: Arc<Vec<String>>,
    ipam: Arc<IpAllocator>,
    runtime: Runtime,
    status: RwLock<UeStatus>,
    stats: Mutex<HashMap<i32, UpStats>>,
    cancel: watch::Sender<bool>,
}

impl Ue {
    /// Creates a powered-off UE.
    pub fn new(
        cfg: UeConfig,
        ipam: Arc<IpAllocator>,
        runtime: Runtime,
        sim_id: String,
        cells: Arc<Vec<String>>,
    ) -> Arc<Self> {
        let (cancel, _) = watch::channel(false);
        Arc::new(Self {
            supi: cfg.supi,
            msisdn: cfg.msisdn,
            imei: cfg.imei,
            plmn: cfg.plmn,
            profile: cfg.profile,
            default_dnn: cfg.dnn,
            default_snssai: cfg.snssai,
            access_type: AccessType::ThreeGppAccess,
            sim_id,
            cells,
            ipam,
            runtime,
            status: RwLock::new(UeStatus {
                ue_state: UeState::Deregistered,
                rm_state: RmState::Deregistered,
                cm_state: CmState::Idle,
                current_cell_id: String::new(),
                sessions: HashMap::new(),
                last_activity: Instant::now(),
            }),
            stats: Mutex::new(HashMap::new()),
            cancel,
        })
    }

    /// Subscription permanent identifier.
    pub fn supi(&self) -> &str {
        &self.supi
    }

    /// Equipment identity.
    pub fn imei(&self) -> &str {
        &self.imei
    }

    /// Profile tag.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Current RM state.
    pub async fn rm_state(&self) -> RmState {
        self.status.read().await.rm_state
    }

    /// Current CM state.
    pub async fn cm_state(&self) -> CmState {
        self.status.read().await.cm_state
    }

    /// Current Markov state.
    pub async fn ue_state(&self) -> UeState {
        self.status.read().await.ue_state
    }

    /// Current serving cell.
    pub async fn current_cell_id(&self) -> String {
        self.status.read().await.current_cell_id.clone()
    }

    /// Number of established PDU sessions.
    pub async fn session_count(&self) -> usize {
        self.status.read().await.sessions.len()
    }

    /// Address of one PDU session, if established.
    pub async fn session_address(&self, session_id: i32) -> Option<Ipv4Addr> {
        self.status
            .read()
            .await
            .sessions
            .get(&session_id)
            .map(|s| s.ipv4)
    }

    /// Usage counters of one PDU session, if reporting is enabled.
    pub async fn session_stats(&self, session_id: i32) -> Option<UpStats> {
        self.stats.lock().await.get(&session_id).cloned()
    }

    // ========================================================================
    // Procedures
    // ========================================================================

    /// Registers the UE: picks a serving cell and reports the registration
    /// and the location to the AMF.
    pub async fn register(&self, rng: &mut StdRng) {
        let mut st = self.status.write().await;

        st.current_cell_id = pick_random_cell(&self.cells, &st.current_cell_id, rng);
        st.rm_state = RmState::Registered;
        info!(
            "[{}] successfully registered to the network, cellId: {}",
            self.supi, st.current_cell_id
        );

        self.send_amf(&st, AmfEventType::RegistrationStateReport);
        self.send_amf(&st, AmfEventType::LocationReport);

        let metrics = &self.runtime.metrics;
        metrics
            .ues_total
            .with_label_values(&[&self.sim_id, RmState::Registered.as_str()])
            .inc();
        metrics
            .ues_total
            .with_label_values(&[&self.sim_id, RmState::Deregistered.as_str()])
            .dec();
    }

    /// Activates the signalling connection and arms the inactivity monitor.
    /// No-op when the UE is not registered.
    pub async fn attach(self: &Arc<Self>, inactivity_timer: Duration) {
        {
            let mut st = self.status.write().await;
            if st.rm_state != RmState::Registered {
                warn!(
                    "UE {} is not registered to the network, cannot attach",
                    self.supi
                );
                return;
            }
            st.cm_state = CmState::Connected;
            info!("[{}] successfully attached to the network", self.supi);
            self.send_amf(&st, AmfEventType::ConnectivityStateReport);
        }

        let ue = Arc::clone(self);
        tokio::spawn(async move { ue.inactivity_monitor(inactivity_timer).await });
    }

    /// Kills the UE RF: reports the loss, deregisters and releases every
    /// PDU session in id order.
    pub async fn loss_of_connection(&self, graceful: bool) {
        info!("[{}] connection lost", self.supi);

        let session_count = {
            let mut st = self.status.write().await;
            self.send_amf(&st, AmfEventType::LossOfConnectivity);

            st.cm_state = CmState::Idle;
            st.rm_state = RmState::Deregistered;

            if graceful {
                self.send_amf(&st, AmfEventType::RegistrationStateReport);
            }
            st.sessions.len() as i32
        };

        let metrics = &self.runtime.metrics;
        metrics
            .ues_total
            .with_label_values(&[&self.sim_id, RmState::Registered.as_str()])
            .dec();
        metrics
            .ues_total
            .with_label_values(&[&self.sim_id, RmState::Deregistered.as_str()])
            .inc();

        for session_id in 1..=session_count {
            self.release_pdu_session(session_id).await;
        }
    }

    /// Establishes a PDU session and, when reporting is enabled, starts the
    /// periodic QoS reporter for it. Requires CM-CONNECTED; allocator
    /// exhaustion drops the establishment silently.
    pub async fn new_pdu_session(
        self: &Arc<Self>,
        session_id: i32,
        dnn: &str,
        snssai: Snssai,
        enable_report: bool,
    ) {
        let mut st = self.status.write().await;
        st.last_activity = Instant::now();

        if st.cm_state != CmState::Connected {
            warn!(
                "[{}] ue is not attached to the network, cannot establish PDU Session",
                self.supi
            );
            return;
        }

        let ip = match self.ipam.allocate(&self.supi, session_id).await {
            Ok(ip) => ip,
            Err(e) => {
                debug!(
                    "[{}] could not allocate IP for session {session_id}: {e}",
                    self.supi
                );
                return;
            }
        };

        let (cancel, _) = watch::channel(false);
        let session = PduSession {
            id: session_id,
            ipv4: ip,
            dnn: dnn.to_string(),
            snssai: snssai.clone(),
            cancel,
        };
        let session_rx = session.cancel.subscribe();
        st.sessions.insert(session_id, session);

        info!(
            "[{}] PDU Session {session_id} established (dnn={dnn}, snssai={snssai}, ip={ip})",
            self.supi
        );

        self.send_smf(SmfEvent::PduSesEst, dnn, &snssai, ip, session_id, None);

        if enable_report {
            self.stats
                .lock()
                .await
                .insert(session_id, UpStats::new(session_id));
            let ue = Arc::clone(self);
            tokio::spawn(async move { ue.userplane_report(session_id, session_rx).await });
        }

        let metrics = &self.runtime.metrics;
        metrics
            .pdu_sessions_total
            .with_label_values(&[&self.sim_id])
            .inc();
        metrics
            .ue_ip_info
            .with_label_values(&[&self.sim_id, &self.supi, &ip.to_string()])
            .set(1);
    }

    /// Releases a PDU session: frees the address, reports the release and
    /// cancels the session scope. Unknown ids return early.
    pub async fn release_pdu_session(&self, session_id: i32) {
        let mut st = self.status.write().await;

        let Some(session) = st.sessions.get(&session_id).cloned() else {
            warn!(
                "[{}] invalid pduSessionId {session_id}, cannot release",
                self.supi
            );
            return;
        };

        if let Err(e) = self.ipam.release(&self.supi, session_id).await {
            debug!("[{}] could not release IP for session {session_id}: {e}", self.supi);
            return;
        }

        let metrics = &self.runtime.metrics;
        let _ = metrics.ue_ip_info.remove_label_values(&[
            &self.sim_id,
            &self.supi,
            &session.ipv4.to_string(),
        ]);
        metrics
            .pdu_sessions_total
            .with_label_values(&[&self.sim_id])
            .dec();

        session.cancel.send_replace(true);
        st.sessions.remove(&session_id);
        self.stats.lock().await.remove(&session_id);

        info!("[{}] released pduSessionId {session_id}", self.supi);

        self.send_smf(
            SmfEvent::PduSesRel,
            &session.dnn,
            &session.snssai,
            session.ipv4,
            session_id,
            None,
        );
    }

    /// Puts the UE into idle mode.
    pub async fn sleep(&self, _force: bool) {
        let mut st = self.status.write().await;
        st.cm_state = CmState::Idle;
        info!("[{}] successfully activated idle mode", self.supi);
        self.send_amf(&st, AmfEventType::ConnectivityStateReport);
    }

    /// Brings an idle UE back to CM-CONNECTED. No-op when not registered or
    /// already connected.
    pub async fn wake_up(&self, is_paging: bool) {
        let mut st = self.status.write().await;

        if st.rm_state != RmState::Registered {
            debug!("[{}] cannot page the ue, not registered", self.supi);
            return;
        }
        if st.cm_state != CmState::Connected {
            st.last_activity = Instant::now();
            if is_paging {
                info!("[{}] paging", self.supi);
            } else {
                info!("[{}] service request", self.supi);
            }
            st.cm_state = CmState::Connected;
            self.send_amf(&st, AmfEventType::ConnectivityStateReport);
        }
    }

    /// Moves the UE to the target cell.
    ///
    /// The location report still carries the source cell; the move is
    /// applied after emission, which downstream consumers rely on.
    pub async fn do_handover(&self, target_cell_id: String) {
        let mut st = self.status.write().await;

        info!("[{}] handover to cell {target_cell_id}", self.supi);
        self.send_amf(&st, AmfEventType::LocationReport);

        st.last_activity = Instant::now();
        st.current_cell_id = target_cell_id;
    }

    /// Starts a packet-producer loop on one session. `duration_secs` of 0
    /// means unbounded; the loop is always bounded by the session scope.
    pub async fn start_traffic_session(
        self: &Arc<Self>,
        session_id: i32,
        uplink: bool,
        profile: &str,
        duration_secs: u64,
    ) {
        let session_rx = {
            let st = self.status.read().await;
            match st.sessions.get(&session_id) {
                Some(session) => session.cancel.subscribe(),
                None => {
                    warn!(
                        "[{}] invalid pduSessionId {session_id}, cannot start traffic",
                        self.supi
                    );
                    return;
                }
            }
        };

        let ue = Arc::clone(self);
        let profile = profile.to_string();
        tokio::spawn(async move {
            ue.traffic_loop(session_id, uplink, profile, duration_secs, session_rx)
                .await
        });
    }

    /// Cancels the UE scope and deregisters from the network.
    pub async fn turn_off(&self, graceful: bool) {
        self.cancel.send_replace(true);
        self.loss_of_connection(graceful).await;
        self.runtime.bus.stop_task(&self.supi);
    }

    /// Registers the UE mailbox and starts the 1 Hz behavior ticker.
    pub async fn power_up(self: &Arc<Self>) {
        self.runtime
            .metrics
            .ues_total
            .with_label_values(&[&self.sim_id, RmState::Deregistered.as_str()])
            .inc();

        let supi = self.supi.clone();
        let started = self
            .runtime
            .bus
            .start_task(&self.supi, DEFAULT_MAILBOX_CAPACITY, move |_msg| {
                let supi = supi.clone();
                async move {
                    debug!("[{supi}] received message from the network");
                }
            });
        if let Err(e) = started {
            warn!("Error starting bus task for UE {}: {e}", self.supi);
            return;
        }

        let ue = Arc::clone(self);
        tokio::spawn(async move { ue.ticker_loop().await });
    }

    // ========================================================================
    // Internal loops
    // ========================================================================

    async fn ticker_loop(self: Arc<Self>) {
        let mut cancel_rx = self.cancel.subscribe();
        let mut rng = StdRng::from_entropy();
        let mut ticker = interval_at(tokio::time::Instant::now() + TICK_PERIOD, TICK_PERIOD);

        loop {
            // A receiver subscribed after cancellation never sees a change.
            if *cancel_rx.borrow() {
                return;
            }
            tokio::select! {
                res = cancel_rx.changed() => {
                    if res.is_err() || *cancel_rx.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    self.step(&mut rng).await;
                }
            }
        }
    }

    async fn step(self: &Arc<Self>, rng: &mut StdRng) {
        let procedure = {
            let mut st = self.status.write().await;
            let (next, procedure) = markov::next_state(rng, st.ue_state);
            st.ue_state = next;
            procedure
        };

        match procedure {
            UeProcedure::Registration => self.register(rng).await,
            UeProcedure::Attach => self.attach(INACTIVITY_TIMER).await,
            UeProcedure::PduSessionEstablishment => {
                let dnn = self.default_dnn.clone();
                let snssai = self.default_snssai.clone();
                self.new_pdu_session(DEFAULT_PDU_SESSION_ID, &dnn, snssai, true)
                    .await;
                self.start_traffic_session(DEFAULT_PDU_SESSION_ID, false, "video", 0)
                    .await;
                self.start_traffic_session(DEFAULT_PDU_SESSION_ID, true, "sip", 0)
                    .await;
            }
            UeProcedure::PduSessionRelease => {
                self.release_pdu_session(DEFAULT_PDU_SESSION_ID).await;
            }
            UeProcedure::LossOfConnection | UeProcedure::HandoverFailure => {
                self.loss_of_connection(false).await;
            }
            UeProcedure::Paging => {
                self.wake_up(true).await;
                self.start_traffic_session(DEFAULT_PDU_SESSION_ID, false, "sip", 0)
                    .await;
            }
            UeProcedure::HandoverSuccessful => {
                let target = {
                    let st = self.status.read().await;
                    pick_random_cell(&self.cells, &st.current_cell_id, rng)
                };
                self.do_handover(target).await;
            }
            UeProcedure::HandoverInitiated
            | UeProcedure::PduSessionFailure
            | UeProcedure::Sleep
            | UeProcedure::NoProcedure => {}
        }
    }

    async fn inactivity_monitor(self: Arc<Self>, inactivity_timer: Duration) {
        let mut cancel_rx = self.cancel.subscribe();
        loop {
            if *cancel_rx.borrow() {
                return;
            }
            tokio::select! {
                res = cancel_rx.changed() => {
                    if res.is_err() || *cancel_rx.borrow() {
                        return;
                    }
                }
                _ = sleep(inactivity_timer) => {
                    let mut st = self.status.write().await;
                    if st.cm_state == CmState::Connected
                        && st.last_activity.elapsed() >= inactivity_timer
                    {
                        info!("[{}] ue inactivity timer expired, idle mode", self.supi);
                        st.cm_state = CmState::Idle;
                        st.ue_state = UeState::Idle;
                        self.send_amf(&st, AmfEventType::ConnectivityStateReport);
                    }
                }
            }
        }
    }

    async fn userplane_report(
        self: Arc<Self>,
        session_id: i32,
        mut session_rx: watch::Receiver<bool>,
    ) {
        let mut cancel_rx = self.cancel.subscribe();
        loop {
            if *cancel_rx.borrow() || *session_rx.borrow() {
                return;
            }
            tokio::select! {
                res = session_rx.changed() => {
                    if res.is_err() || *session_rx.borrow() {
                        info!(
                            "[{}] stopped userplane report for PDU Session {session_id}",
                            self.supi
                        );
                        return;
                    }
                }
                res = cancel_rx.changed() => {
                    if res.is_err() || *cancel_rx.borrow() {
                        return;
                    }
                }
                _ = sleep(QOS_REPORT_PERIOD) => {
                    let session = {
                        let st = self.status.read().await;
                        match st.sessions.get(&session_id) {
                            Some(session) => session.clone(),
                            None => return,
                        }
                    };
                    let report = {
                        let stats = self.stats.lock().await;
                        match stats.get(&session_id) {
                            Some(stats) => stats.report(Instant::now()),
                            None => return,
                        }
                    };
                    self.send_smf(
                        SmfEvent::QosMon,
                        &session.dnn,
                        &session.snssai,
                        session.ipv4,
                        session_id,
                        Some(report),
                    );
                }
            }
        }
    }

    async fn traffic_loop(
        self: Arc<Self>,
        session_id: i32,
        uplink: bool,
        profile: String,
        duration_secs: u64,
        mut session_rx: watch::Receiver<bool>,
    ) {
        let mut cancel_rx = self.cancel.subscribe();
        let mut generator = traffic::by_profile(&self.supi, &profile);
        let deadline = (duration_secs > 0)
            .then(|| tokio::time::Instant::now() + Duration::from_secs(duration_secs));
        let direction = if uplink { DIR_UL } else { DIR_DL };

        loop {
            if *cancel_rx.borrow() || *session_rx.borrow() {
                return;
            }
            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    info!(
                        "[{}] traffic session ended for session {session_id}",
                        self.supi
                    );
                    return;
                }
            }

            tokio::select! {
                res = session_rx.changed() => {
                    if res.is_err() || *session_rx.borrow() {
                        info!(
                            "[{}] traffic session cancelled for session {session_id}",
                            self.supi
                        );
                        return;
                    }
                }
                res = cancel_rx.changed() => {
                    if res.is_err() || *cancel_rx.borrow() {
                        return;
                    }
                }
                _ = sleep(TRAFFIC_POLL_PERIOD) => {
                    let now = Instant::now();
                    if let Some(packet) = generator.next_packet(now) {
                        self.wake_up(false).await;
                        self.status.write().await.last_activity = now;

                        let mut stats = self.stats.lock().await;
                        if let Some(entry) = stats.get_mut(&session_id) {
                            entry.new_packet(uplink, packet.size_bytes as i64, now);

                            let metrics = &self.runtime.metrics;
                            metrics
                                .traffic_packets
                                .with_label_values(&[&self.sim_id, &self.supi, direction])
                                .inc();
                            metrics
                                .traffic_bytes
                                .with_label_values(&[&self.sim_id, &self.supi, direction])
                                .inc_by(packet.size_bytes as u64);
                            metrics
                                .total_traffic
                                .with_label_values(&[&self.sim_id, direction])
                                .inc_by(packet.size_bytes as u64);
                        }
                    }
                }
            }
        }
    }

    // ========================================================================
    // Bus emission
    // ========================================================================

    fn send_amf(&self, st: &UeStatus, event_type: AmfEventType) {
        let msg = UeToAmfMsg {
            event_type,
            timestamp: Utc::now(),
            rm_state: st.rm_state,
            cm_state: st.cm_state,
            supi: self.supi.clone(),
            gpsi: self.msisdn.clone(),
            plmn: self.plmn.clone(),
            current_cell_id: st.current_cell_id.clone(),
            access_type: self.access_type,
        };
        if let Err(e) = self
            .runtime
            .bus
            .send(&self.supi, "AMF", BusPayload::UeToAmf(msg))
        {
            warn!("Error sending UeToAmfMsg for UE {}: {e}", self.supi);
        }
    }

    fn send_smf(
        &self,
        event_type: SmfEvent,
        dnn: &str,
        snssai: &Snssai,
        ue_address: Ipv4Addr,
        pdu_sess_id: i32,
        up_report: Option<UpStatsReport>,
    ) {
        let msg = UeToSmfMsg {
            event_type,
            timestamp: Utc::now(),
            supi: self.supi.clone(),
            gpsi: self.msisdn.clone(),
            plmn: self.plmn.clone(),
            access_type: self.access_type,
            dnn: dnn.to_string(),
            snssai: snssai.clone(),
            ue_address,
            pdu_sess_type: PduSessType::Ipv4,
            pdu_sess_id,
            ddds_state: None,
            up_report,
        };
        if let Err(e) = self
            .runtime
            .bus
            .send(&self.supi, "SMF", BusPayload::UeToSmf(msg))
        {
            warn!("Error sending UeToSmfMsg for UE {}: {e}", self.supi);
        }
    }
}

/// Picks a cell different from the current one, uniformly over the list.
/// With a single cell (or none) there is nothing to pick.
fn pick_random_cell(cells: &[String], current: &str, rng: &mut impl Rng) -> String {
    if cells.len() <= 1 {
        return String::new();
    }
    loop {
        let idx = rng.gen_range(0..cells.len());
        if cells[idx] != current {
            return cells[idx].clone();
        }
    }
}
