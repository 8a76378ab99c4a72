//! Webview message pump and REST surface.
//!
//! Browsers connect at `/ws` and exchange `{command, value}` frames; the
//! current graph snapshot is also queryable at `/api/graph` so a freshly
//! opened view can catch up without replaying the stream.

use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use gatescope_bridge::SimEvent;
use gatescope_protocol::{VizRequest, VizUpdate};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::graph::{GraphEdge, GraphModel, GraphNode};
use crate::view::HierarchyView;

#[derive(Clone)]
pub struct InspectorState {
    /// Webview commands, consumed by the view task.
    pub requests: mpsc::UnboundedSender<VizRequest>,
    /// Serialized updates, fanned out to every connected webview.
    pub updates: broadcast::Sender<String>,
    /// Server-side copy of what the webview renders.
    pub graph: Arc<Mutex<GraphModel>>,
}

pub fn router(state: InspectorState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/graph", get(graph_handler))
        .with_state(state)
}

async fn ws_handler(State(state): State<InspectorState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| pump_socket(socket, state))
}

/// Bidirectional pump between one webview and the view task.
pub async fn pump_socket(socket: WebSocket, state: InspectorState) {
    info!("webview connected");
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut updates = state.updates.subscribe();

    let updates_to_ws = async move {
        loop {
            match updates.recv().await {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        info!("webview closed (send failed)");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "webview fell behind, updates dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let ws_to_view = async move {
        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let request: VizRequest = match serde_json::from_str(&text) {
                        Ok(request) => request,
                        Err(err) => {
                            warn!(error = %err, "unparseable webview command");
                            continue;
                        }
                    };
                    if state.requests.send(request).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("webview closed");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "webview socket error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = updates_to_ws => {},
        _ = ws_to_view => {},
    }
    info!("webview disconnected");
}

#[derive(Debug, Serialize)]
struct GraphSnapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    time: Option<u64>,
    clock_paused: bool,
}

async fn graph_handler(State(state): State<InspectorState>) -> impl IntoResponse {
    let graph = state.graph.lock().expect("graph mutex poisoned");
    Json(GraphSnapshot {
        nodes: graph.nodes().to_vec(),
        edges: graph.edges().to_vec(),
        time: graph.time(),
        clock_paused: graph.clock_paused(),
    })
}

/// Drive the view: webview commands in, updates and simulator pushes out.
pub async fn run_view(
    mut view: HierarchyView,
    mut requests: mpsc::UnboundedReceiver<VizRequest>,
    mut view_updates: mpsc::UnboundedReceiver<VizUpdate>,
    mut sim_events: mpsc::UnboundedReceiver<SimEvent>,
    state: InspectorState,
) {
    loop {
        tokio::select! {
            Some(request) = requests.recv() => {
                if let Err(err) = view.handle_request(request).await {
                    error!(error = %err, "view request failed");
                }
            }
            Some(update) = view_updates.recv() => publish(&state, update),
            Some(event) = sim_events.recv() => match event {
                SimEvent::Value(value) => publish(&state, VizUpdate::Value(value)),
                SimEvent::ClockPaused(clock) => {
                    publish(&state, VizUpdate::Time(clock.time));
                    publish(&state, VizUpdate::ClockPaused(clock));
                }
                SimEvent::Terminated => {
                    info!("simulation ended");
                    break;
                }
                other => debug!(?other, "event without a view effect"),
            },
            else => break,
        }
    }
    view.dispose().await;
}

fn publish(state: &InspectorState, update: VizUpdate) {
    state
        .graph
        .lock()
        .expect("graph mutex poisoned")
        .apply(&update);
    match serde_json::to_string(&update) {
        // No webview connected is fine; the graph snapshot catches them up.
        Ok(text) => drop(state.updates.send(text)),
        Err(err) => error!(error = %err, "failed to serialize update"),
    }
}
