//! View-controller tests against the stub simulator: monitor add/remove
//! pairing across scope changes and edge dedup into the graph model.

use std::sync::Arc;

use gatescope_bridge::client::stub::{StubCall, StubSim};
use gatescope_bridge::SimClient;
use gatescope_inspector::{GraphModel, HierarchyView};
use gatescope_protocol::{ConnectionEdge, HierarchyReply, VizRequest};
use tokio::sync::mpsc;

fn edge(from: &str, var_from: &str, to: &str, var_to: &str) -> ConnectionEdge {
    ConnectionEdge {
        handle_from: from.to_string(),
        var_from: var_from.to_string(),
        handle_to: to.to_string(),
        var_to: var_to.to_string(),
    }
}

fn hierarchy(children: &[&str]) -> HierarchyReply {
    HierarchyReply {
        children: children.iter().map(|c| c.to_string()).collect(),
        values: None,
    }
}

async fn seeded_sim() -> StubSim {
    let sim = StubSim::spawn().await;
    sim.set_hierarchy("$", hierarchy(&["top.a", "top.b"]));
    // The a->b wire is reported by both endpoints.
    sim.set_connections_to("top.a", vec![edge("top.clkgen", "clk", "top.a", "clk_in")]);
    sim.set_connections_from("top.a", vec![edge("top.a", "out", "top.b", "in")]);
    sim.set_connections_to("top.b", vec![edge("top.a", "out", "top.b", "in")]);
    sim
}

#[tokio::test]
async fn every_driver_is_monitored_exactly_once() {
    let sim = seeded_sim().await;
    let client = Arc::new(SimClient::new(&sim.ip(), sim.port()));
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let mut view = HierarchyView::new(client, update_tx);

    view.enter_scope("$").await.expect("enter root scope");

    assert_eq!(view.scope(), Some("$"));
    assert_eq!(
        view.monitored(),
        vec!["top.a.out".to_string(), "top.clkgen.clk".to_string()]
    );

    let calls = sim.calls();
    let add_count = |handle: &str| {
        calls
            .iter()
            .filter(|call| matches!(call, StubCall::AddMonitor(h) if h == handle))
            .count()
    };
    assert_eq!(add_count("top.a.out"), 1, "duplicate edge must not re-add");
    assert_eq!(add_count("top.clkgen.clk"), 1);

    // The dedup also holds in the rendered graph.
    let mut model = GraphModel::default();
    while let Ok(update) = update_rx.try_recv() {
        model.apply(&update);
    }
    assert_eq!(model.nodes().len(), 3, "clkgen joins via its connection");
    assert_eq!(model.edges().len(), 2);
}

#[tokio::test]
async fn scope_change_releases_every_monitor() {
    let sim = seeded_sim().await;
    sim.set_hierarchy("top.a", hierarchy(&["top.a.u0"]));

    let client = Arc::new(SimClient::new(&sim.ip(), sim.port()));
    let (update_tx, _update_rx) = mpsc::unbounded_channel();
    let mut view = HierarchyView::new(client, update_tx);

    view.enter_scope("$").await.expect("enter root scope");
    let registered = view.monitored();
    assert_eq!(registered.len(), 2);

    view.enter_scope("top.a").await.expect("enter child scope");
    assert!(
        view.monitored().is_empty(),
        "child scope has no connections, so nothing stays monitored"
    );

    let calls = sim.calls();
    for handle in registered {
        let adds = calls
            .iter()
            .filter(|call| matches!(call, StubCall::AddMonitor(h) if *h == handle))
            .count();
        let removes = calls
            .iter()
            .filter(|call| matches!(call, StubCall::RemoveMonitor(h) if *h == handle))
            .count();
        assert_eq!(adds, removes, "{handle}: every add needs a paired remove");
    }
}

#[tokio::test]
async fn dispose_releases_monitors() {
    let sim = seeded_sim().await;
    let client = Arc::new(SimClient::new(&sim.ip(), sim.port()));
    let (update_tx, _update_rx) = mpsc::unbounded_channel();
    let mut view = HierarchyView::new(client, update_tx);

    view.enter_scope("$").await.expect("enter root scope");
    view.dispose().await;

    assert!(view.monitored().is_empty());
    let removes = sim
        .calls()
        .iter()
        .filter(|call| matches!(call, StubCall::RemoveMonitor(_)))
        .count();
    assert_eq!(removes, 2);
}

#[tokio::test]
async fn webview_commands_reach_the_simulator() {
    let sim = seeded_sim().await;
    let client = Arc::new(SimClient::new(&sim.ip(), sim.port()));
    let (update_tx, _update_rx) = mpsc::unbounded_channel();
    let mut view = HierarchyView::new(client, update_tx);

    view.handle_request(VizRequest::PauseOnClock(true))
        .await
        .expect("pause on clock");
    view.handle_request(VizRequest::Continue)
        .await
        .expect("continue");
    view.handle_request(VizRequest::AddMonitor("top.a.out".to_string()))
        .await
        .expect("add monitor");
    view.handle_request(VizRequest::RemoveMonitor("top.a.out".to_string()))
        .await
        .expect("remove monitor");

    let calls = sim.calls();
    assert!(calls.contains(&StubCall::Clock(true)));
    assert!(calls.contains(&StubCall::ClockSynch));
    assert!(calls.contains(&StubCall::Continue));
    assert!(calls.contains(&StubCall::AddMonitor("top.a.out".to_string())));
    assert!(calls.contains(&StubCall::RemoveMonitor("top.a.out".to_string())));
}
