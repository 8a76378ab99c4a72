//! In-process stub simulator for testing.
//!
//! Serves the control-port surface on an ephemeral port and records every
//! call for verification. Available for integration tests and external
//! test crates; no production code path uses it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use gatescope_protocol::{
    BreakpointReply, BreakpointRequest, ConnectRequest, ConnectionEdge, ContextFrame,
    HierarchyReply,
};
use serde::Serialize;
use tokio::task::JoinHandle;

/// One recorded control call.
#[derive(Debug, Clone, PartialEq)]
pub enum StubCall {
    Connect { ip: String, port: u16 },
    Files,
    AddBreakpoint(BreakpointRequest),
    RemoveBreakpoint(BreakpointRequest),
    ClearFile(String),
    Continue,
    StepOver,
    Context(String, u64),
    Time,
    Hierarchy(String),
    ConnectionsTo(String),
    ConnectionsFrom(String),
    AddMonitor(String),
    RemoveMonitor(String),
    Clock(bool),
    ClockSynch,
}

#[derive(Default)]
struct StubState {
    calls: Mutex<Vec<StubCall>>,
    last_connect: Mutex<Option<ConnectRequest>>,
    /// (filename, line) -> server-side breakpoint id.
    valid_lines: Mutex<HashMap<(String, u64), u64>>,
    files: Mutex<Vec<String>>,
    hierarchy: Mutex<HashMap<String, HierarchyReply>>,
    connections_to: Mutex<HashMap<String, Vec<ConnectionEdge>>>,
    connections_from: Mutex<HashMap<String, Vec<ConnectionEdge>>>,
    context: Mutex<Vec<ContextFrame>>,
    time: AtomicU64,
}

/// A stub simulator listening on an ephemeral local port.
pub struct StubSim {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
    http: reqwest::Client,
}

impl StubSim {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("stub simulator should bind an ephemeral port");
        let addr = listener.local_addr().expect("stub listener address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            state,
            handle,
            http: reqwest::Client::new(),
        }
    }

    pub fn ip(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Declare a legal breakpoint target and the id it resolves to.
    pub fn add_valid_line(&self, filename: &str, line: u64, server_id: u64) {
        self.state
            .valid_lines
            .lock()
            .expect("stub valid_lines mutex poisoned")
            .insert((filename.to_string(), line), server_id);
    }

    pub fn set_files(&self, files: Vec<String>) {
        *self.state.files.lock().expect("stub files mutex poisoned") = files;
    }

    pub fn set_hierarchy(&self, scope: &str, reply: HierarchyReply) {
        self.state
            .hierarchy
            .lock()
            .expect("stub hierarchy mutex poisoned")
            .insert(scope.to_string(), reply);
    }

    pub fn set_connections_to(&self, handle: &str, edges: Vec<ConnectionEdge>) {
        self.state
            .connections_to
            .lock()
            .expect("stub connections mutex poisoned")
            .insert(handle.to_string(), edges);
    }

    pub fn set_connections_from(&self, handle: &str, edges: Vec<ConnectionEdge>) {
        self.state
            .connections_from
            .lock()
            .expect("stub connections mutex poisoned")
            .insert(handle.to_string(), edges);
    }

    pub fn set_context(&self, frames: Vec<ContextFrame>) {
        *self.state.context.lock().expect("stub context mutex poisoned") = frames;
    }

    pub fn set_time(&self, time: u64) {
        self.state.time.store(time, Ordering::SeqCst);
    }

    /// Snapshot of every control call received so far.
    pub fn calls(&self) -> Vec<StubCall> {
        self.state
            .calls
            .lock()
            .expect("stub calls mutex poisoned")
            .clone()
    }

    /// The callback registration received via `connect`, if any.
    pub fn last_connect(&self) -> Option<ConnectRequest> {
        self.state
            .last_connect
            .lock()
            .expect("stub connect mutex poisoned")
            .clone()
    }

    /// Push a payload to the connected client's callback listener, the way
    /// the real simulator reports progress.
    pub async fn push<T: Serialize>(&self, path: &str, body: &T) {
        let connect = self
            .last_connect()
            .expect("push requires a prior connect call");
        let url = format!("http://{}:{}{}", connect.ip, connect.port, path);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .expect("push to callback listener");
        assert!(resp.status().is_success(), "callback push rejected");
    }

    /// Push a bodyless notification such as `/status/synch` or `/stop`.
    pub async fn push_empty(&self, path: &str) {
        let connect = self
            .last_connect()
            .expect("push requires a prior connect call");
        let url = format!("http://{}:{}{}", connect.ip, connect.port, path);
        let resp = self
            .http
            .post(url)
            .send()
            .await
            .expect("push to callback listener");
        assert!(resp.status().is_success(), "callback push rejected");
    }
}

impl Drop for StubSim {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record(state: &StubState, call: StubCall) {
    state
        .calls
        .lock()
        .expect("stub calls mutex poisoned")
        .push(call);
}

fn with_leading_slash(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/connect", post(on_connect))
        .route("/files", get(on_files))
        .route("/breakpoint", post(on_add_breakpoint).delete(on_remove_breakpoint))
        .route("/breakpoint/file/*filename", delete(on_clear_file))
        .route("/continue", post(on_continue))
        .route("/step_over", post(on_step_over))
        .route("/context/*location", get(on_context))
        .route("/time", get(on_time))
        .route("/hierarchy/:handle", post(on_hierarchy))
        .route("/connection/to/:handle", get(on_connections_to))
        .route("/connection/from/:handle", get(on_connections_from))
        .route("/monitor/:handle", post(on_add_monitor).delete(on_remove_monitor))
        .route("/clock/on", post(on_clock_on))
        .route("/clock/off", post(on_clock_off))
        .route("/clock/synch", post(on_clock_synch))
        .with_state(state)
}

async fn on_connect(
    State(state): State<Arc<StubState>>,
    Json(req): Json<ConnectRequest>,
) -> StatusCode {
    record(
        &state,
        StubCall::Connect {
            ip: req.ip.clone(),
            port: req.port,
        },
    );
    *state
        .last_connect
        .lock()
        .expect("stub connect mutex poisoned") = Some(req);
    StatusCode::OK
}

async fn on_files(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    record(&state, StubCall::Files);
    let files = state.files.lock().expect("stub files mutex poisoned").clone();
    Json(files)
}

async fn on_add_breakpoint(
    State(state): State<Arc<StubState>>,
    Json(req): Json<BreakpointRequest>,
) -> impl IntoResponse {
    record(&state, StubCall::AddBreakpoint(req.clone()));
    let id = state
        .valid_lines
        .lock()
        .expect("stub valid_lines mutex poisoned")
        .get(&(req.filename.clone(), req.line_num))
        .copied();
    match id {
        Some(id) => Json(BreakpointReply { id }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn on_remove_breakpoint(
    State(state): State<Arc<StubState>>,
    Json(req): Json<BreakpointRequest>,
) -> StatusCode {
    record(&state, StubCall::RemoveBreakpoint(req));
    StatusCode::OK
}

async fn on_clear_file(
    State(state): State<Arc<StubState>>,
    Path(filename): Path<String>,
) -> StatusCode {
    record(&state, StubCall::ClearFile(with_leading_slash(filename)));
    StatusCode::OK
}

async fn on_continue(State(state): State<Arc<StubState>>) -> StatusCode {
    record(&state, StubCall::Continue);
    StatusCode::OK
}

async fn on_step_over(State(state): State<Arc<StubState>>) -> StatusCode {
    record(&state, StubCall::StepOver);
    StatusCode::OK
}

async fn on_context(
    State(state): State<Arc<StubState>>,
    Path(location): Path<String>,
) -> impl IntoResponse {
    let location = with_leading_slash(location);
    let (filename, line) = match location.rsplit_once(':') {
        Some((file, line)) => match line.parse::<u64>() {
            Ok(line) => (file.to_string(), line),
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        },
        None => return StatusCode::BAD_REQUEST.into_response(),
    };
    record(&state, StubCall::Context(filename, line));
    let frames = state.context.lock().expect("stub context mutex poisoned").clone();
    Json(frames).into_response()
}

async fn on_time(State(state): State<Arc<StubState>>) -> impl IntoResponse {
    record(&state, StubCall::Time);
    Json(state.time.load(Ordering::SeqCst))
}

async fn on_hierarchy(
    State(state): State<Arc<StubState>>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    record(&state, StubCall::Hierarchy(handle.clone()));
    let reply = state
        .hierarchy
        .lock()
        .expect("stub hierarchy mutex poisoned")
        .get(&handle)
        .cloned()
        .unwrap_or(HierarchyReply {
            children: Vec::new(),
            values: None,
        });
    Json(reply)
}

async fn on_connections_to(
    State(state): State<Arc<StubState>>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    record(&state, StubCall::ConnectionsTo(handle.clone()));
    let edges = state
        .connections_to
        .lock()
        .expect("stub connections mutex poisoned")
        .get(&handle)
        .cloned()
        .unwrap_or_default();
    Json(edges)
}

async fn on_connections_from(
    State(state): State<Arc<StubState>>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    record(&state, StubCall::ConnectionsFrom(handle.clone()));
    let edges = state
        .connections_from
        .lock()
        .expect("stub connections mutex poisoned")
        .get(&handle)
        .cloned()
        .unwrap_or_default();
    Json(edges)
}

async fn on_add_monitor(
    State(state): State<Arc<StubState>>,
    Path(handle): Path<String>,
) -> StatusCode {
    record(&state, StubCall::AddMonitor(handle));
    StatusCode::OK
}

async fn on_remove_monitor(
    State(state): State<Arc<StubState>>,
    Path(handle): Path<String>,
) -> StatusCode {
    record(&state, StubCall::RemoveMonitor(handle));
    StatusCode::OK
}

async fn on_clock_on(State(state): State<Arc<StubState>>) -> StatusCode {
    record(&state, StubCall::Clock(true));
    StatusCode::OK
}

async fn on_clock_off(State(state): State<Arc<StubState>>) -> StatusCode {
    record(&state, StubCall::Clock(false));
    StatusCode::OK
}

async fn on_clock_synch(State(state): State<Arc<StubState>>) -> StatusCode {
    record(&state, StubCall::ClockSynch);
    StatusCode::OK
}
