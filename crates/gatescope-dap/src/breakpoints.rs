//! Client-declared breakpoints and their reconciliation with the simulator.
//!
//! A breakpoint is created optimistically: the caller gets a `Pending`
//! snapshot back immediately, validation runs against the simulator in the
//! background, and the outcome is published on the update channel so the
//! session can correct the client with a follow-up breakpoint event.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gatescope_bridge::{DebugDb, PathMap, SimClient};
use gatescope_protocol::BreakpointRequest;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Dedup key: distinct requests at the same physical location resolve to
/// the same server-side breakpoint.
pub type LocationKey = (String, u64, Option<u64>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointState {
    /// Returned to the client, validation still in flight.
    Pending,
    /// The simulator confirmed the location.
    Valid { server_id: u64 },
    /// The location has no simulator target; shown greyed out, never
    /// silently dropped.
    Invalid,
}

/// Immutable snapshot of one client-visible breakpoint.
#[derive(Debug, Clone)]
pub struct Breakpoint {
    pub id: u64,
    pub filename: String,
    pub line: u64,
    pub column: Option<u64>,
    pub condition: Option<String>,
    pub state: BreakpointState,
}

impl Breakpoint {
    pub fn verified(&self) -> bool {
        matches!(self.state, BreakpointState::Valid { .. })
    }

    pub fn location(&self) -> LocationKey {
        (self.filename.clone(), self.line, self.column)
    }
}

struct Inner {
    next_id: u64,
    entries: HashMap<u64, Breakpoint>,
    client: Option<Arc<SimClient>>,
    remap: PathMap,
}

/// Registry of client breakpoints.
///
/// Usable before any simulator connection exists: entries stay `Pending`
/// until [`attach`](BreakpointRegistry::attach) supplies a client, at
/// which point everything staged is validated.
pub struct BreakpointRegistry {
    inner: Mutex<Inner>,
    db: Mutex<Option<DebugDb>>,
    updates: mpsc::UnboundedSender<Breakpoint>,
}

impl BreakpointRegistry {
    pub fn new(updates: mpsc::UnboundedSender<Breakpoint>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                entries: HashMap::new(),
                client: None,
                remap: PathMap::default(),
            }),
            db: Mutex::new(None),
            updates,
        }
    }

    /// Install the debug database used for location probes.
    pub fn set_database(&self, db: DebugDb) {
        *self.db.lock().expect("registry db mutex poisoned") = Some(db);
    }

    /// Connect the registry to a live simulator and validate everything
    /// staged so far.
    pub fn attach(self: &Arc<Self>, client: Arc<SimClient>, remap: PathMap) {
        let staged: Vec<u64> = {
            let mut inner = self.lock_inner();
            inner.client = Some(client);
            inner.remap = remap;
            inner
                .entries
                .values()
                .filter(|bp| bp.state == BreakpointState::Pending)
                .map(|bp| bp.id)
                .collect()
        };
        for id in staged {
            self.spawn_validation(id);
        }
    }

    /// Drop the simulator connection; entries survive for a later attach.
    pub fn detach(&self) {
        self.lock_inner().client = None;
    }

    /// Register a breakpoint at the location, optimistically `Pending`.
    pub fn set(
        self: &Arc<Self>,
        filename: String,
        line: u64,
        column: Option<u64>,
        condition: Option<String>,
    ) -> Breakpoint {
        let bp = {
            let mut inner = self.lock_inner();
            let id = inner.next_id;
            inner.next_id += 1;
            let bp = Breakpoint {
                id,
                filename,
                line,
                column,
                condition,
                state: BreakpointState::Pending,
            };
            inner.entries.insert(id, bp.clone());
            bp
        };
        if self.lock_inner().client.is_some() {
            self.spawn_validation(bp.id);
        }
        bp
    }

    /// Remove every entry for the file locally, then issue the one bulk
    /// removal call. Callers must await this before setting fresh
    /// breakpoints for the same file, or a stale removal can race them.
    pub async fn clear_file(&self, filename: &str) -> gatescope_bridge::Result<()> {
        let (client, sim_path) = {
            let mut inner = self.lock_inner();
            inner.entries.retain(|_, bp| bp.filename != filename);
            (inner.client.clone(), inner.remap.to_simulator(filename))
        };
        if let Some(client) = client {
            client.clear_file_breakpoints(&sim_path).await?;
        }
        Ok(())
    }

    /// Column offsets a breakpoint can be set at, from the debug database.
    /// Read-only; registry state is untouched.
    pub fn query_locations(&self, filename: &str, line: u64) -> Vec<u64> {
        let guard = self.db.lock().expect("registry db mutex poisoned");
        match guard.as_ref() {
            Some(db) => db.breakpoint_columns(filename, line).unwrap_or_else(|err| {
                error!(error = %err, filename, line, "breakpoint location probe failed");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn get(&self, id: u64) -> Option<Breakpoint> {
        self.lock_inner().entries.get(&id).cloned()
    }

    pub fn for_file(&self, filename: &str) -> Vec<Breakpoint> {
        let mut found: Vec<Breakpoint> = self
            .lock_inner()
            .entries
            .values()
            .filter(|bp| bp.filename == filename)
            .cloned()
            .collect();
        found.sort_by_key(|bp| bp.id);
        found
    }

    /// Every client-visible id that resolved to the given server id; a
    /// pushed breakpoint hit names the server side.
    pub fn local_ids_for_server(&self, server_id: u64) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .lock_inner()
            .entries
            .values()
            .filter(|bp| bp.state == BreakpointState::Valid { server_id })
            .map(|bp| bp.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("registry mutex poisoned")
    }

    fn spawn_validation(self: &Arc<Self>, id: u64) {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            registry.validate(id).await;
        });
    }

    async fn validate(&self, id: u64) {
        let (client, request, shared) = {
            let inner = self.lock_inner();
            let Some(bp) = inner.entries.get(&id) else {
                return;
            };
            let Some(client) = inner.client.clone() else {
                return;
            };
            // Another entry at the same location may already be resolved.
            let shared = inner
                .entries
                .values()
                .find(|other| {
                    other.id != id
                        && other.location() == bp.location()
                        && matches!(other.state, BreakpointState::Valid { .. })
                })
                .and_then(|other| match other.state {
                    BreakpointState::Valid { server_id } => Some(server_id),
                    _ => None,
                });
            let request = BreakpointRequest {
                filename: inner.remap.to_simulator(&bp.filename),
                line_num: bp.line,
                column_num: bp.column,
                expr: bp.condition.clone(),
            };
            (client, request, shared)
        };

        let state = match shared {
            Some(server_id) => BreakpointState::Valid { server_id },
            None => match client.add_breakpoint(&request).await {
                Ok(reply) => BreakpointState::Valid {
                    server_id: reply.id,
                },
                Err(err) => {
                    debug!(error = %err, id, "breakpoint did not resolve");
                    BreakpointState::Invalid
                }
            },
        };

        let updated = {
            let mut inner = self.lock_inner();
            let Some(bp) = inner.entries.get_mut(&id) else {
                // Cleared while validation was in flight; the result is stale.
                return;
            };
            bp.state = state;
            bp.clone()
        };
        if self.updates.send(updated).is_err() {
            debug!("breakpoint update dropped, session is gone");
        }
    }
}
