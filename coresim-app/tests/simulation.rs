//! End-to-end flows over the real SBI and notification HTTP paths:
//! subscribers register over HTTP, UEs drive procedures, and the tests
//! observe the resulting 3GPP notifications on a loopback collector.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::sleep;

use coresim_app::{SimController, SimulationStatus};
use coresim_common::config::NetworkConfig;
use coresim_common::types::{PlmnId, Snssai};
use coresim_common::Runtime;
use coresim_core::{sbi_router, Amf, IpAllocator, Pcf, SbiState, Smf};
use coresim_ran::ue::{Ue, UeConfig};

type Inbox = Arc<Mutex<Vec<Value>>>;

async fn collect(State(inbox): State<Inbox>, Json(body): Json<Value>) {
    inbox.lock().await.push(body);
}

/// Starts a loopback subscriber collecting notification bodies.
async fn start_collector() -> (SocketAddr, Inbox) {
    let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/cb", post(collect))
        .with_state(inbox.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, inbox)
}

struct Network {
    runtime: Runtime,
    ipam: Arc<IpAllocator>,
    sbi_addr: SocketAddr,
}

/// Wires the three NFs to a fresh runtime and serves the SBI router on an
/// ephemeral port.
async fn start_network() -> Network {
    let runtime = Runtime::new().unwrap();
    let plmn = PlmnId::new("208", "95");
    let ipam = Arc::new(IpAllocator::new("12.1.0.0/24").unwrap());

    let amf = Arc::new(Amf::new(plmn.clone()));
    let smf = Arc::new(Smf::new(plmn.clone()));
    let pcf = Arc::new(Pcf::new(plmn, ipam.clone()));
    amf.spawn(&runtime).unwrap();
    smf.spawn(&runtime).unwrap();
    pcf.spawn(&runtime).unwrap();

    let router = sbi_router(SbiState { amf, smf, pcf });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let sbi_addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Network {
        runtime,
        ipam,
        sbi_addr,
    }
}

fn spawn_ue(net: &Network) -> Arc<Ue> {
    Ue::new(
        UeConfig {
            supi: "208950000000001".to_string(),
            msisdn: "+336100000000".to_string(),
            imei: "490154203237518".to_string(),
            dnn: "internet".to_string(),
            snssai: Snssai {
                sst: 1,
                sd: Some("000001".to_string()),
            },
            profile: "Smartphone".to_string(),
            plmn: PlmnId::new("208", "95"),
        },
        net.ipam.clone(),
        net.runtime.clone(),
        "sim-it".to_string(),
        Arc::new(vec![
            "000000000".to_string(),
            "000000001".to_string(),
            "000000002".to_string(),
            "000000003".to_string(),
        ]),
    )
}

/// Polls the inbox until it holds `count` bodies or the timeout elapses.
async fn wait_for_notifications(inbox: &Inbox, count: usize) -> Vec<Value> {
    for _ in 0..100 {
        {
            let bodies = inbox.lock().await;
            if bodies.len() >= count {
                return bodies.clone();
            }
        }
        sleep(Duration::from_millis(50)).await;
    }
    inbox.lock().await.clone()
}

#[tokio::test]
async fn test_registration_events_reach_subscriber() {
    let (cb_addr, inbox) = start_collector().await;
    let net = start_network().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/namf-evts/v1/subscriptions", net.sbi_addr))
        .json(&json!({
            "subscription": {
                "eventList": [
                    {"type": "REGISTRATION_STATE_REPORT"},
                    {"type": "LOCATION_REPORT"}
                ],
                "eventNotifyUri": format!("http://{cb_addr}/cb")
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let ue = spawn_ue(&net);
    let mut rng = StdRng::seed_from_u64(1);
    ue.register(&mut rng).await;

    let bodies = wait_for_notifications(&inbox, 2).await;
    assert_eq!(bodies.len(), 2, "expected two notifications, got {bodies:?}");

    // Fan-out POSTs race each other, so assert on the set of event kinds.
    let mut kinds: Vec<String> = bodies
        .iter()
        .map(|b| b["reportList"][0]["type"].as_str().unwrap().to_string())
        .collect();
    kinds.sort();
    assert_eq!(kinds, vec!["LOCATION_REPORT", "REGISTRATION_STATE_REPORT"]);

    for body in &bodies {
        let report = &body["reportList"][0];
        assert_eq!(report["supi"], "208950000000001");
        assert_eq!(report["state"]["active"], true);
        assert_eq!(report["location"]["nrLocation"]["tai"]["tac"], "001010");
    }
}

#[tokio::test]
async fn test_pdu_session_establishment_notifies_once_with_address() {
    let (cb_addr, inbox) = start_collector().await;
    let net = start_network().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!(
            "http://{}/nsmf-event-exposure/v1/subscriptions",
            net.sbi_addr
        ))
        .json(&json!({
            "eventSubscriptions": [{"event": "PDU_SES_EST"}],
            "notifUri": format!("http://{cb_addr}/cb")
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let ue = spawn_ue(&net);
    let mut rng = StdRng::seed_from_u64(2);
    ue.register(&mut rng).await;
    ue.attach(Duration::from_secs(60)).await;
    ue.new_pdu_session(1, "internet", Snssai { sst: 1, sd: None }, false)
        .await;
    let ip = ue.session_address(1).await.unwrap();

    let bodies = wait_for_notifications(&inbox, 1).await;
    assert_eq!(bodies.len(), 1);

    let event = &bodies[0]["eventNotifs"][0];
    assert_eq!(event["event"], "PDU_SES_EST");
    assert_eq!(event["ipv4Addr"], ip.to_string());
    assert_eq!(event["pduSessType"], "IPV4");
    assert_eq!(event["pduSeId"], 1);
    assert!(bodies[0]["notifId"].as_str().unwrap().len() > 4);

    // No duplicate for a single establishment.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(inbox.lock().await.len(), 1);
}

#[tokio::test]
async fn test_pcf_policy_authorization_flow() {
    let net = start_network().await;
    let client = reqwest::Client::new();
    let base = format!(
        "http://{}/npcf-policyauthorization/v1/app-sessions",
        net.sbi_addr
    );

    let ip = net.ipam.allocate("208950000000001", 1).await.unwrap();

    // Neither medComponents nor afRoutReq: 400.
    let resp = client
        .post(&base)
        .json(&json!({"ascReqData": {"ueIpv4": ip.to_string()}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown address: 404.
    let resp = client
        .post(&base)
        .json(&json!({"ascReqData": {"ueIpv4": "10.9.9.9", "medComponents": {}}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // QoS request: 201 with a Location header naming the session.
    let resp = client
        .post(&base)
        .json(&json!({"ascReqData": {"ueIpv4": ip.to_string(), "medComponents": {"mc": {}}}}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let location = resp
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with("/npcf-policyauthorization/v1/app-sessions/"));

    // Delete succeeds once, then misses.
    let delete_url = format!("http://{}{}/delete", net.sbi_addr, location);
    let resp = client.post(&delete_url).send().await.unwrap();
    assert!(resp.status().is_success());
    let resp = client.post(&delete_url).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    // Update is not implemented.
    let resp = client
        .post(format!("http://{}{}", net.sbi_addr, location))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 501);
}

#[tokio::test]
async fn test_population_lifecycle_and_restart() {
    let controller = SimController::new(0, Runtime::new().unwrap());
    let profile = NetworkConfig {
        snssai: Snssai { sst: 1, sd: None },
        plmn: PlmnId::new("208", "95"),
        dnn: "internet".to_string(),
        num_of_gnb: 4,
        num_of_ue: 3,
        arrival_rate: 200.0,
    };

    controller.configure(profile).await.unwrap();
    controller.start().await.unwrap();
    assert_eq!(controller.status().await, SimulationStatus::Started);

    // With a 200/s arrival rate all three UEs appear almost immediately.
    let mut count = 0;
    for _ in 0..100 {
        count = controller.ue_count().await;
        if count >= 3 {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(count, 3);

    controller.stop().await.unwrap();
    assert_eq!(controller.ue_count().await, 0);

    // Restart reuses the instance and produces a fresh population.
    controller.start().await.unwrap();
    let mut count = 0;
    for _ in 0..100 {
        count = controller.ue_count().await;
        if count >= 3 {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(count, 3);
}
