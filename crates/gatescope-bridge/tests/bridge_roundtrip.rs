//! Bridge round-trip tests against the in-process stub simulator.

use std::collections::BTreeMap;
use std::time::Duration;

use gatescope_bridge::client::stub::{StubCall, StubSim};
use gatescope_bridge::{CallbackServer, SimClient, SimEvent, StopCause};
use gatescope_protocol::{BreakpointRequest, ConnectRequest, HierarchyReply, StopPayload};
use tokio::sync::mpsc;

fn connect_request(port: u16) -> ConnectRequest {
    ConnectRequest {
        ip: "127.0.0.1".to_string(),
        port,
        database: "/work/debug.db".to_string(),
        src_path: None,
        dst_path: None,
    }
}

#[tokio::test]
async fn control_calls_round_trip() {
    let sim = StubSim::spawn().await;
    sim.add_valid_line("/design/top.py", 10, 77);
    sim.set_time(1250);
    sim.set_hierarchy(
        "$",
        HierarchyReply {
            children: vec!["top.alu".to_string(), "top.regs".to_string()],
            values: None,
        },
    );

    let client = SimClient::new(&sim.ip(), sim.port());

    let reply = client
        .add_breakpoint(&BreakpointRequest {
            filename: "/design/top.py".to_string(),
            line_num: 10,
            column_num: None,
            expr: None,
        })
        .await
        .expect("valid location should resolve");
    assert_eq!(reply.id, 77);

    let missing = client
        .add_breakpoint(&BreakpointRequest {
            filename: "/design/top.py".to_string(),
            line_num: 11,
            column_num: None,
            expr: None,
        })
        .await;
    assert!(missing.is_err(), "unknown location must surface an error");

    client
        .remove_breakpoint(&BreakpointRequest {
            filename: "/design/top.py".to_string(),
            line_num: 10,
            column_num: None,
            expr: None,
        })
        .await
        .expect("remove breakpoint");

    sim.set_files(vec!["/design/top.py".to_string(), "/design/alu.py".to_string()]);
    assert_eq!(client.files().await.expect("files").len(), 2);

    assert_eq!(client.time().await.expect("time"), 1250);

    let hierarchy = client.hierarchy("$").await.expect("hierarchy");
    assert_eq!(hierarchy.children.len(), 2);

    client
        .clear_file_breakpoints("/design/top.py")
        .await
        .expect("bulk clear");
    client.continue_run().await.expect("continue");

    let calls = sim.calls();
    assert!(calls.contains(&StubCall::ClearFile("/design/top.py".to_string())));
    assert!(calls.contains(&StubCall::Continue));
}

#[tokio::test]
async fn callback_pushes_become_events() {
    let sim = StubSim::spawn().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callback = CallbackServer::spawn(tx).await.expect("callback listener");

    let client = SimClient::new(&sim.ip(), sim.port());
    client
        .connect(&connect_request(callback.port()))
        .await
        .expect("connect");

    let payload = StopPayload {
        id: Some(77),
        instance_id: 3,
        instance_name: Some("top.alu".to_string()),
        filename: "/design/top.py".to_string(),
        line_num: 10,
        column_num: None,
        local: vec![BTreeMap::from([("a".to_string(), "1".to_string())])],
        generator: vec![BTreeMap::new()],
    };
    sim.push("/status/breakpoint", &payload).await;

    match rx.recv().await.expect("stop event") {
        SimEvent::Stopped { cause, payload } => {
            assert_eq!(cause, StopCause::Breakpoint);
            assert_eq!(payload.instance_id, 3);
            assert_eq!(payload.id, Some(77));
        }
        other => panic!("expected stop event, got {other:?}"),
    }

    sim.push_empty("/status/synch").await;
    assert!(matches!(
        rx.recv().await.expect("synch event"),
        SimEvent::Synchronized
    ));
}

#[tokio::test]
async fn stop_push_closes_the_listener() {
    let sim = StubSim::spawn().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let callback = CallbackServer::spawn(tx).await.expect("callback listener");
    let port = callback.port();

    let client = SimClient::new(&sim.ip(), sim.port());
    client
        .connect(&connect_request(port))
        .await
        .expect("connect");

    sim.push_empty("/stop").await;
    assert!(matches!(
        rx.recv().await.expect("terminate event"),
        SimEvent::Terminated
    ));

    // The listener shuts down shortly after acknowledging /stop.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let probe = reqwest::Client::new()
        .post(format!("http://127.0.0.1:{port}/status/synch"))
        .send()
        .await;
    assert!(probe.is_err(), "listener should refuse connections after /stop");
}
