//! Hierarchy navigation and monitor bookkeeping.
//!
//! Every edge discovered while traversing a scope registers its driving
//! signal for live-value push. The server does no reference counting, so
//! each add is paired with an explicit remove when the scope changes or
//! the view goes away.

use std::collections::HashSet;
use std::sync::Arc;

use gatescope_bridge::{Result, SimClient};
use gatescope_protocol::{ConnectionEdge, ValuePayload, VizRequest, VizUpdate};
use tokio::sync::mpsc;
use tracing::{debug, error};

pub struct HierarchyView {
    client: Arc<SimClient>,
    updates: mpsc::UnboundedSender<VizUpdate>,
    monitors: HashSet<String>,
    scope: Option<String>,
}

impl HierarchyView {
    pub fn new(client: Arc<SimClient>, updates: mpsc::UnboundedSender<VizUpdate>) -> Self {
        Self {
            client,
            updates,
            monitors: HashSet::new(),
            scope: None,
        }
    }

    /// The scope currently on display.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Handles currently registered for value push.
    pub fn monitored(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.monitors.iter().cloned().collect();
        handles.sort();
        handles
    }

    pub async fn handle_request(&mut self, request: VizRequest) -> Result<()> {
        match request {
            VizRequest::Hierarchy(handle) => self.enter_scope(&handle).await,
            VizRequest::AddMonitor(handle) => self.add_monitor(&handle).await,
            VizRequest::RemoveMonitor(handle) => self.remove_monitor(&handle).await,
            VizRequest::PauseOnClock(on) => {
                self.client.set_clock(on).await?;
                if on {
                    // Run to a synchronization point so the first sampled
                    // values are stable.
                    self.client.clock_synch().await?;
                }
                Ok(())
            }
            VizRequest::Continue => self.client.continue_run().await,
        }
    }

    /// Navigate to a hierarchy scope: release the old scope's monitors,
    /// list the children, then walk both connection directions per child.
    pub async fn enter_scope(&mut self, handle: &str) -> Result<()> {
        self.release_monitors().await;

        let reply = self.client.hierarchy(handle).await?;
        self.scope = Some(handle.to_string());
        self.send(VizUpdate::Hierarchy(reply.children.clone()));
        if let Some(values) = reply.values {
            for (handle, value) in values {
                self.send(VizUpdate::Value(ValuePayload { handle, value }));
            }
        }

        // The same wire may be reported by both the "to" and "from"
        // queries of its two endpoints; the key set keeps one copy.
        let mut seen = HashSet::new();
        for child in &reply.children {
            let inbound = self.client.connections_to(child).await?;
            let fresh: Vec<ConnectionEdge> = inbound
                .into_iter()
                .filter(|edge| seen.insert(edge.key()))
                .collect();
            self.register_drivers(&fresh).await;
            if !fresh.is_empty() {
                self.send(VizUpdate::ConnectionTo(fresh));
            }

            let outbound = self.client.connections_from(child).await?;
            let fresh: Vec<ConnectionEdge> = outbound
                .into_iter()
                .filter(|edge| seen.insert(edge.key()))
                .collect();
            self.register_drivers(&fresh).await;
            if !fresh.is_empty() {
                self.send(VizUpdate::ConnectionFrom(fresh));
            }
        }
        Ok(())
    }

    /// Release every monitor; called when the view is disposed.
    pub async fn dispose(&mut self) {
        self.release_monitors().await;
    }

    async fn add_monitor(&mut self, handle: &str) -> Result<()> {
        if self.monitors.insert(handle.to_string()) {
            if let Err(err) = self.client.add_monitor(handle).await {
                self.monitors.remove(handle);
                return Err(err);
            }
        } else {
            debug!(handle, "monitor already registered");
        }
        Ok(())
    }

    async fn remove_monitor(&mut self, handle: &str) -> Result<()> {
        if self.monitors.remove(handle) {
            self.client.remove_monitor(handle).await?;
        }
        Ok(())
    }

    async fn register_drivers(&mut self, edges: &[ConnectionEdge]) {
        for edge in edges {
            let driver = edge.driver();
            if self.monitors.insert(driver.clone()) {
                if let Err(err) = self.client.add_monitor(&driver).await {
                    error!(error = %err, handle = %driver, "monitor registration failed");
                    self.monitors.remove(&driver);
                }
            }
        }
    }

    async fn release_monitors(&mut self) {
        for handle in std::mem::take(&mut self.monitors) {
            // A failed removal is surfaced once; the handle is dropped
            // locally either way so the pairing holds on our side.
            if let Err(err) = self.client.remove_monitor(&handle).await {
                error!(error = %err, handle = %handle, "monitor removal failed");
            }
        }
    }

    fn send(&self, update: VizUpdate) {
        if self.updates.send(update).is_err() {
            debug!("view update dropped, webview is gone");
        }
    }
}
