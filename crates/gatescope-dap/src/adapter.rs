//! The DAP session controller.
//!
//! Translates protocol requests into bridge calls and pushed simulator
//! events into protocol events. All simulator interaction is asynchronous
//! and nothing here guarantees that a push observes the request that
//! triggered it: handlers re-read the frame store instead of assuming
//! freshness across suspension points.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use dap::events::{BreakpointEventBody, Event, StoppedEventBody, ThreadEventBody};
use dap::prelude::*;
use dap::types::{
    Breakpoint as ClientBreakpoint, BreakpointEventReason, BreakpointLocation, Capabilities,
    Message, Scope, Source, StackFrame, StoppedEventReason, Thread, ThreadEventReason, Variable,
};
use gatescope_bridge::{
    net, BridgeConfig, CallbackServer, DebugDb, PathMap, SimClient, SimEvent, StopCause,
};
use gatescope_protocol::{ConnectRequest, StopPayload};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, error, info};

use crate::breakpoints::{Breakpoint, BreakpointRegistry};
use crate::frames::{
    group_variables, FrameHandle, FrameStore, HandlePool, ScopeKind, VariableKey,
};

/// How long `launch` waits for `configurationDone` before proceeding
/// anyway; the host may never send it.
const CONFIG_DONE_WAIT: Duration = Duration::from_secs(1);

/// Thread id reported before the first simulator push names real instances.
const DEFAULT_THREAD_ID: i64 = 1;

/// DAP session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initialized,
    ConfigurationPending,
    Running,
    Stopped,
    Terminated,
}

/// Per-launch state.
pub struct Session {
    client: Arc<SimClient>,
    callback: Option<CallbackServer>,
    remap: PathMap,
    frames: FrameStore,
    handles: HandlePool,
    live_instances: Vec<u64>,
    synchronized: bool,
    /// Simulator-side path and line of the last stop.
    stop_location: Option<(String, u64)>,
}

pub(crate) struct EventStreams {
    sim_rx: mpsc::UnboundedReceiver<SimEvent>,
    bp_rx: mpsc::UnboundedReceiver<Breakpoint>,
}

pub struct DebugAdapter {
    session: Arc<Mutex<Option<Session>>>,
    event_tx: Arc<Mutex<Option<mpsc::Sender<Event>>>>,
    phase: Arc<StdMutex<SessionPhase>>,
    registry: Arc<BreakpointRegistry>,
    config_done: Arc<Notify>,
    cancelled: Arc<StdMutex<HashSet<i64>>>,
    sim_tx: mpsc::UnboundedSender<SimEvent>,
    streams: StdMutex<Option<EventStreams>>,
}

impl DebugAdapter {
    pub fn new() -> Self {
        let (sim_tx, sim_rx) = mpsc::unbounded_channel();
        let (bp_tx, bp_rx) = mpsc::unbounded_channel();
        Self {
            session: Arc::new(Mutex::new(None)),
            event_tx: Arc::new(Mutex::new(None)),
            phase: Arc::new(StdMutex::new(SessionPhase::Uninitialized)),
            registry: Arc::new(BreakpointRegistry::new(bp_tx)),
            config_done: Arc::new(Notify::new()),
            cancelled: Arc::new(StdMutex::new(HashSet::new())),
            sim_tx,
            streams: StdMutex::new(Some(EventStreams { sim_rx, bp_rx })),
        }
    }

    pub async fn set_event_sender(&self, tx: mpsc::Sender<Event>) {
        let mut event_tx = self.event_tx.lock().await;
        *event_tx = Some(tx);
    }

    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().expect("phase mutex poisoned")
    }

    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.lock().expect("phase mutex poisoned") = phase;
    }

    /// Start translating pushed events; idempotent, first caller wins.
    pub fn spawn_event_pump(self: &Arc<Self>) {
        let Some(streams) = self
            .streams
            .lock()
            .expect("streams mutex poisoned")
            .take()
        else {
            return;
        };
        let adapter = Arc::clone(self);
        tokio::spawn(async move { adapter.pump_events(streams).await });
    }

    async fn send_event(&self, event: Event) {
        let event_tx = self.event_tx.lock().await;
        if let Some(ref tx) = *event_tx {
            let _ = tx.send(event).await;
        }
    }

    fn is_cancelled(&self, seq: i64) -> bool {
        self.cancelled
            .lock()
            .expect("cancel set mutex poisoned")
            .contains(&seq)
    }

    pub async fn handle_request(&self, request: Request) -> Response {
        let body = match request.command {
            Command::Initialize(_) => {
                self.set_phase(SessionPhase::Initialized);
                // Invite configuration (breakpoints) before launch proceeds.
                self.send_event(Event::Initialized).await;
                self.set_phase(SessionPhase::ConfigurationPending);
                ResponseBody::Initialize(Capabilities {
                    supports_configuration_done_request: Some(true),
                    supports_conditional_breakpoints: Some(true),
                    supports_breakpoint_locations_request: Some(true),
                    supports_cancel_request: Some(true),
                    supports_terminate_request: Some(true),
                    supports_data_breakpoints: Some(true),
                    supports_step_back: Some(false),
                    supports_completions_request: Some(false),
                    supports_evaluate_for_hovers: Some(false),
                    ..Default::default()
                })
            }
            Command::ConfigurationDone => {
                self.config_done.notify_one();
                ResponseBody::ConfigurationDone
            }
            Command::Launch(ref args) => {
                let config: BridgeConfig = match args.additional_data.as_ref() {
                    Some(data) => match serde_json::from_value(data.clone()) {
                        Ok(config) => config,
                        Err(err) => {
                            return self.make_error_response(
                                &request,
                                format!("invalid launch configuration: {err}"),
                            )
                        }
                    },
                    None => {
                        return self.make_error_response(
                            &request,
                            "launch request carries no configuration".to_string(),
                        )
                    }
                };

                // Bounded wait; launch proceeds even if the host never
                // sends configurationDone.
                let _ = tokio::time::timeout(CONFIG_DONE_WAIT, self.config_done.notified()).await;

                let stop_on_entry = config.stop_on_entry;
                if let Err(message) = self.start_session(config).await {
                    return self.make_error_response(&request, message);
                }

                if stop_on_entry {
                    // The simulator is paused by default at load; no push
                    // will announce this stop.
                    self.set_phase(SessionPhase::Stopped);
                    self.send_event(Event::Stopped(StoppedEventBody {
                        reason: StoppedEventReason::String("entry".to_string()),
                        thread_id: Some(DEFAULT_THREAD_ID),
                        all_threads_stopped: Some(true),
                        text: None,
                        description: None,
                        preserve_focus_hint: None,
                        hit_breakpoint_ids: None,
                    }))
                    .await;
                } else {
                    let client = self
                        .session
                        .lock()
                        .await
                        .as_ref()
                        .map(|session| session.client.clone());
                    if let Some(client) = client {
                        if let Err(err) = client.continue_run().await {
                            return self.make_error_response(
                                &request,
                                format!("cannot resume simulator: {err}"),
                            );
                        }
                    }
                    self.set_phase(SessionPhase::Running);
                }
                ResponseBody::Launch
            }
            Command::SetBreakpoints(ref args) => {
                let Some(path) = args.source.path.clone() else {
                    return self.make_error_response(
                        &request,
                        "breakpoints require a source path".to_string(),
                    );
                };
                // Full replace. The bulk removal must complete before the
                // fresh inserts or a stale removal races them.
                if let Err(err) = self.registry.clear_file(&path).await {
                    return self.make_error_response(
                        &request,
                        format!("clearing breakpoints for {path} failed: {err}"),
                    );
                }
                let requested = args.breakpoints.clone().unwrap_or_default();
                let mut seen = HashSet::new();
                let mut results = Vec::new();
                for bp in &requested {
                    // One result entry per unique location, not per
                    // requested line.
                    if !seen.insert((bp.line, bp.column)) {
                        continue;
                    }
                    let created = self.registry.set(
                        path.clone(),
                        bp.line as u64,
                        bp.column.map(|c| c as u64),
                        bp.condition.clone(),
                    );
                    results.push(client_breakpoint(&created));
                }
                ResponseBody::SetBreakpoints(dap::responses::SetBreakpointsResponse {
                    breakpoints: results,
                })
            }
            Command::BreakpointLocations(ref args) => {
                let breakpoints = match args.source.path.as_deref() {
                    Some(path) => self
                        .registry
                        .query_locations(path, args.line as u64)
                        .into_iter()
                        .map(|column| BreakpointLocation {
                            line: args.line,
                            column: Some(column as i64),
                            end_line: None,
                            end_column: None,
                        })
                        .collect(),
                    None => Vec::new(),
                };
                ResponseBody::BreakpointLocations(dap::responses::BreakpointLocationsResponse {
                    breakpoints,
                })
            }
            Command::DataBreakpointInfo(ref args) => {
                // Clock-edge pausing is exposed as one synthetic "scope"
                // watch; there is no per-variable hardware watchpoint.
                ResponseBody::DataBreakpointInfo(dap::responses::DataBreakpointInfoResponse {
                    data_id: Some("scope".to_string()),
                    description: format!("pause on clock edges ({})", args.name),
                    access_types: None,
                    can_persist: Some(false),
                })
            }
            Command::SetDataBreakpoints(ref args) => {
                let enable = !args.breakpoints.is_empty();
                let client = self
                    .session
                    .lock()
                    .await
                    .as_ref()
                    .map(|session| session.client.clone());
                if let Some(client) = client {
                    if let Err(err) = client.set_clock(enable).await {
                        return self.make_error_response(
                            &request,
                            format!("cannot toggle clock pausing: {err}"),
                        );
                    }
                }
                ResponseBody::SetDataBreakpoints(dap::responses::SetDataBreakpointsResponse {
                    breakpoints: args
                        .breakpoints
                        .iter()
                        .map(|_| ClientBreakpoint {
                            verified: true,
                            ..Default::default()
                        })
                        .collect(),
                })
            }
            Command::Threads => {
                let session_opt = self.session.lock().await;
                let threads = match session_opt.as_ref() {
                    Some(session) if !session.frames.is_empty() => session
                        .frames
                        .instance_ids()
                        .into_iter()
                        .map(|id| Thread {
                            id: id as i64,
                            name: session
                                .frames
                                .get(id)
                                .map(|snap| snap.display_name())
                                .unwrap_or_else(|| format!("instance {id}")),
                        })
                        .collect(),
                    _ => vec![Thread {
                        id: DEFAULT_THREAD_ID,
                        name: "simulation".to_string(),
                    }],
                };
                ResponseBody::Threads(dap::responses::ThreadsResponse { threads })
            }
            Command::StackTrace(ref args) => {
                let session_opt = self.session.lock().await;
                let stack_frames = match session_opt.as_ref() {
                    Some(session) => build_stack_frames(session, args.thread_id),
                    None => Vec::new(),
                };
                let total = stack_frames.len() as i64;
                ResponseBody::StackTrace(dap::responses::StackTraceResponse {
                    stack_frames,
                    total_frames: Some(total),
                })
            }
            Command::Scopes(ref args) => {
                let mut session_opt = self.session.lock().await;
                let scopes = match session_opt.as_mut() {
                    Some(session) => match FrameHandle::decode(args.frame_id) {
                        Ok(handle) => scope_list(session, handle),
                        Err(err) => {
                            // Malformed handles degrade to an empty result
                            // instead of failing the request.
                            error!(error = %err, frame_id = args.frame_id, "bad frame handle");
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                };
                ResponseBody::Scopes(dap::responses::ScopesResponse { scopes })
            }
            Command::Variables(ref args) => {
                let resolved = {
                    let mut session_opt = self.session.lock().await;
                    match session_opt.as_mut() {
                        Some(session) => resolve_variables(session, args.variables_reference),
                        None => Resolved::Empty,
                    }
                };
                let mut variables = match resolved {
                    Resolved::Entries(variables) => variables,
                    Resolved::Empty => Vec::new(),
                    Resolved::Global(client) => match client.time().await {
                        Ok(time) => vec![Variable {
                            name: "time".to_string(),
                            value: time.to_string(),
                            type_field: Some("integer".to_string()),
                            variables_reference: 0,
                            ..Default::default()
                        }],
                        Err(err) => {
                            error!(error = %err, "simulator time read failed");
                            Vec::new()
                        }
                    },
                };
                if self.is_cancelled(request.seq) {
                    // The side effect already landed; drop the late result.
                    variables = Vec::new();
                }
                ResponseBody::Variables(dap::responses::VariablesResponse { variables })
            }
            Command::Continue(_) => {
                let client = {
                    let mut session_opt = self.session.lock().await;
                    session_opt.as_mut().map(|session| {
                        session.synchronized = false;
                        session.client.clone()
                    })
                };
                let Some(client) = client else {
                    return self
                        .make_error_response(&request, "no active session".to_string());
                };
                if let Err(err) = client.continue_run().await {
                    return self
                        .make_error_response(&request, format!("cannot resume simulator: {err}"));
                }
                self.set_phase(SessionPhase::Running);
                ResponseBody::Continue(dap::responses::ContinueResponse {
                    all_threads_continued: Some(true),
                })
            }
            Command::Next(_) => {
                let client = {
                    let mut session_opt = self.session.lock().await;
                    session_opt.as_mut().map(|session| {
                        session.synchronized = false;
                        session.client.clone()
                    })
                };
                let Some(client) = client else {
                    return self
                        .make_error_response(&request, "no active session".to_string());
                };
                if let Err(err) = client.step_over().await {
                    return self
                        .make_error_response(&request, format!("cannot step simulator: {err}"));
                }
                self.set_phase(SessionPhase::Running);
                ResponseBody::Next
            }
            Command::Cancel(ref args) => {
                if let Some(request_id) = args.request_id {
                    self.cancelled
                        .lock()
                        .expect("cancel set mutex poisoned")
                        .insert(request_id);
                }
                return Response {
                    request_seq: request.seq,
                    success: true,
                    body: None,
                    error: None,
                    message: None,
                };
            }
            Command::Terminate(_) => {
                self.teardown().await;
                ResponseBody::Terminate
            }
            Command::Disconnect(_) => {
                self.teardown().await;
                ResponseBody::Disconnect
            }
            _ => {
                return self
                    .make_error_response(&request, "request not supported".to_string())
            }
        };

        Response {
            request_seq: request.seq,
            success: true,
            body: Some(body),
            error: None,
            message: None,
        }
    }

    /// Open the database, start the callback listener, and register with
    /// the simulator. Any failure is fatal to session start; nothing
    /// retries.
    async fn start_session(&self, config: BridgeConfig) -> Result<(), String> {
        let db = DebugDb::open(&config.database).map_err(|err| {
            format!(
                "cannot open debug database {}: {err}",
                config.database.display()
            )
        })?;
        self.registry.set_database(db);

        let client = Arc::new(SimClient::new(&config.runtime_ip, config.runtime_port));
        let callback = CallbackServer::spawn(self.sim_tx.clone())
            .await
            .map_err(|err| format!("cannot start callback listener: {err}"))?;

        let ip = match net::routable_ip(&config.runtime_ip) {
            Ok(ip) => ip.to_string(),
            Err(err) => {
                callback.shutdown().await;
                return Err(err.to_string());
            }
        };

        let connect = ConnectRequest {
            ip,
            port: callback.port(),
            database: config.database.display().to_string(),
            src_path: config.src_path.clone(),
            dst_path: config.dst_path.clone(),
        };
        if let Err(err) = client.connect(&connect).await {
            callback.shutdown().await;
            return Err(format!("simulator connection failed: {err}"));
        }
        info!(base = client.base(), "simulator connected");

        let remap = config.path_map();
        // Everything staged during configuration is validated now.
        self.registry.attach(client.clone(), remap.clone());

        let mut session_opt = self.session.lock().await;
        *session_opt = Some(Session {
            client,
            callback: Some(callback),
            remap,
            frames: FrameStore::default(),
            handles: HandlePool::default(),
            live_instances: Vec::new(),
            synchronized: false,
            stop_location: None,
        });
        Ok(())
    }

    /// Release simulator-facing resources before the host considers the
    /// session closed.
    async fn teardown(&self) {
        let callback = {
            let mut session_opt = self.session.lock().await;
            session_opt
                .as_mut()
                .and_then(|session| session.callback.take())
        };
        if let Some(callback) = callback {
            callback.shutdown().await;
        }
        *self.session.lock().await = None;
        self.registry.detach();
        self.set_phase(SessionPhase::Terminated);
    }

    async fn pump_events(self: Arc<Self>, mut streams: EventStreams) {
        loop {
            tokio::select! {
                Some(event) = streams.sim_rx.recv() => self.on_sim_event(event).await,
                Some(bp) = streams.bp_rx.recv() => {
                    // Post-hoc validation: correct the optimistic response
                    // already sent for this breakpoint.
                    self.send_event(Event::Breakpoint(BreakpointEventBody {
                        reason: BreakpointEventReason::Changed,
                        breakpoint: client_breakpoint(&bp),
                    }))
                    .await;
                }
                else => break,
            }
        }
    }

    async fn on_sim_event(&self, event: SimEvent) {
        match event {
            SimEvent::Stopped { cause, payload } => self.on_stop(cause, payload).await,
            SimEvent::ClockPaused(clock) => {
                self.set_phase(SessionPhase::Stopped);
                let instances = self
                    .session
                    .lock()
                    .await
                    .as_ref()
                    .map(|session| session.live_instances.clone())
                    .unwrap_or_default();
                let threads: Vec<i64> = if instances.is_empty() {
                    vec![DEFAULT_THREAD_ID]
                } else {
                    instances.iter().map(|&id| id as i64).collect()
                };
                for thread_id in threads {
                    self.send_event(Event::Stopped(StoppedEventBody {
                        reason: StoppedEventReason::String("pause".to_string()),
                        thread_id: Some(thread_id),
                        all_threads_stopped: Some(true),
                        text: Some(format!("paused on clock edge at {}", clock.time)),
                        description: None,
                        preserve_focus_hint: None,
                        hit_breakpoint_ids: None,
                    }))
                    .await;
                }
            }
            SimEvent::Value(value) => {
                debug!(handle = %value.handle, "value push without a registered observer");
            }
            SimEvent::Synchronized => self.on_synchronized().await,
            SimEvent::Terminated => {
                self.teardown().await;
                self.send_event(Event::Terminated(None)).await;
            }
        }
    }

    async fn on_stop(&self, cause: StopCause, payload: StopPayload) {
        let (previous, current, hits) = {
            let mut session_opt = self.session.lock().await;
            let Some(session) = session_opt.as_mut() else {
                return;
            };
            let editor_path = session.remap.to_editor(&payload.filename);
            let previous = std::mem::take(&mut session.live_instances);
            session.frames.apply_stop(&payload, editor_path);
            session.handles.reset();
            session.live_instances = session.frames.instance_ids();
            session.synchronized = false;
            session.stop_location = Some((payload.filename.clone(), payload.line_num));
            let hits = payload
                .id
                .map(|server_id| self.registry.local_ids_for_server(server_id))
                .unwrap_or_default();
            (previous, session.live_instances.clone(), hits)
        };
        self.set_phase(SessionPhase::Stopped);

        // The concurrently active instance set changes between stops; the
        // protocol needs explicit lifecycle events to keep its thread list
        // consistent, so the previous set is retired wholesale.
        for id in previous {
            self.send_event(Event::Thread(ThreadEventBody {
                reason: ThreadEventReason::Exited,
                thread_id: id as i64,
            }))
            .await;
        }

        let reason = match cause {
            StopCause::Breakpoint => StoppedEventReason::Breakpoint,
            StopCause::Step => StoppedEventReason::Step,
            StopCause::Exception => StoppedEventReason::String("exception".to_string()),
        };
        let hit_breakpoint_ids = match cause {
            StopCause::Breakpoint if !hits.is_empty() => {
                Some(hits.iter().map(|&id| id as i64).collect::<Vec<_>>())
            }
            _ => None,
        };
        for id in current {
            self.send_event(Event::Stopped(StoppedEventBody {
                reason: reason.clone(),
                thread_id: Some(id as i64),
                all_threads_stopped: Some(true),
                text: None,
                description: None,
                preserve_focus_hint: None,
                hit_breakpoint_ids: hit_breakpoint_ids.clone(),
            }))
            .await;
        }
    }

    /// A synchronization point makes arbitrary scope queries safe; widen
    /// the snapshot with every instance at the stop location.
    async fn on_synchronized(&self) {
        let refine = {
            let mut session_opt = self.session.lock().await;
            let Some(session) = session_opt.as_mut() else {
                return;
            };
            if session.synchronized {
                // Already refined for this pause.
                None
            } else {
                session.synchronized = true;
                session
                    .stop_location
                    .clone()
                    .map(|location| (session.client.clone(), location))
            }
        };
        let Some((client, (filename, line))) = refine else {
            return;
        };
        match client.context(&filename, line).await {
            Ok(frames) => {
                let mut session_opt = self.session.lock().await;
                if let Some(session) = session_opt.as_mut() {
                    let editor_path = session.remap.to_editor(&filename);
                    session.frames.apply_context(&frames, &editor_path, line);
                    session.live_instances = session.frames.instance_ids();
                }
            }
            Err(err) => debug!(error = %err, "context refinement failed"),
        }
    }

    fn make_error_response(&self, request: &Request, message: String) -> Response {
        error!(seq = request.seq, "{message}");
        Response {
            request_seq: request.seq,
            success: false,
            body: None,
            error: Some(Message {
                id: 0,
                format: message.clone(),
                variables: HashMap::new(),
                send_telemetry: None,
                show_user: Some(true),
                url: None,
                url_label: None,
            }),
            message: Some(dap::responses::ResponseMessage::Error(message)),
        }
    }
}

impl Default for DebugAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn client_breakpoint(bp: &Breakpoint) -> ClientBreakpoint {
    ClientBreakpoint {
        id: Some(bp.id as i64),
        verified: bp.verified(),
        line: Some(bp.line as i64),
        column: bp.column.map(|c| c as i64),
        ..Default::default()
    }
}

fn source_for(path: &str) -> Source {
    let name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Source {
        name,
        path: Some(path.to_string()),
        ..Default::default()
    }
}

fn build_stack_frames(session: &Session, thread_id: i64) -> Vec<StackFrame> {
    if thread_id < 0 {
        return Vec::new();
    }
    let instance_id = thread_id as u64;
    // Instances can disappear between a stackTrace and the stop that
    // produced it; answer with an empty list, not an error.
    let Some(snapshot) = session.frames.get(instance_id) else {
        return Vec::new();
    };
    let mut frames = Vec::new();
    for index in 0..snapshot.frames.len() {
        let id = match FrameHandle::new(instance_id, index as u64).encode() {
            Ok(id) => id,
            Err(err) => {
                error!(error = %err, instance_id, "frame handle out of range");
                return Vec::new();
            }
        };
        frames.push(StackFrame {
            id,
            name: snapshot.display_name(),
            source: Some(source_for(&snapshot.filename)),
            line: snapshot.line as i64,
            column: snapshot.column.unwrap_or(0) as i64,
            ..Default::default()
        });
    }
    frames
}

fn scope_list(session: &mut Session, handle: FrameHandle) -> Vec<Scope> {
    let mut scope = |name: &str, kind: ScopeKind, expensive: bool| Scope {
        name: name.to_string(),
        variables_reference: session.handles.intern(VariableKey::Scope {
            kind,
            instance_id: handle.instance_id,
            stack_index: handle.stack_index,
        }),
        expensive,
        ..Default::default()
    };
    vec![
        scope("Local", ScopeKind::Local, false),
        scope("Generator Variables", ScopeKind::Generator, false),
        scope("Simulator Values", ScopeKind::Global, true),
    ]
}

enum Resolved {
    Entries(Vec<Variable>),
    /// The global scope reads simulated time synchronously; the call runs
    /// outside the session lock.
    Global(Arc<SimClient>),
    Empty,
}

fn resolve_variables(session: &mut Session, reference: i64) -> Resolved {
    let Some(key) = session.handles.get(reference).cloned() else {
        return Resolved::Empty;
    };
    match key {
        VariableKey::Scope {
            kind: ScopeKind::Global,
            ..
        } => Resolved::Global(session.client.clone()),
        VariableKey::Scope {
            kind,
            instance_id,
            stack_index,
        } => member_variables(session, kind, instance_id, stack_index, None),
        VariableKey::Member {
            kind,
            instance_id,
            stack_index,
            prefix,
        } => member_variables(session, kind, instance_id, stack_index, Some(prefix)),
    }
}

fn member_variables(
    session: &mut Session,
    kind: ScopeKind,
    instance_id: u64,
    stack_index: u64,
    prefix: Option<String>,
) -> Resolved {
    let Some(frame) = session.frames.scope_frame(instance_id, stack_index).cloned() else {
        return Resolved::Empty;
    };
    let vars = match kind {
        ScopeKind::Local => &frame.local,
        ScopeKind::Generator => &frame.generator,
        ScopeKind::Global => return Resolved::Empty,
    };
    let mut variables = Vec::new();
    for entry in group_variables(vars, prefix.as_deref()) {
        match entry.container_prefix {
            Some(container) => {
                let reference = session.handles.intern(VariableKey::Member {
                    kind,
                    instance_id,
                    stack_index,
                    prefix: container,
                });
                variables.push(Variable {
                    name: entry.name,
                    value: "Object".to_string(),
                    type_field: Some("object".to_string()),
                    variables_reference: reference,
                    ..Default::default()
                });
            }
            None => variables.push(Variable {
                name: entry.name,
                value: entry.value.unwrap_or_default(),
                type_field: Some("integer".to_string()),
                variables_reference: 0,
                ..Default::default()
            }),
        }
    }
    Resolved::Entries(variables)
}
