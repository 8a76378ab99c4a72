//! Node/edge model behind the rendered circuit view.
//!
//! Nodes are keyed by their hierarchical handle and mapped to small local
//! ids; edges are deduplicated by the canonical wire key so a wire
//! reported by both endpoints renders once.

use std::collections::{BTreeMap, HashMap, HashSet};

use gatescope_protocol::{ConnectionEdge, VizUpdate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: u64,
    /// Last path segment, what the view prints on the node.
    pub label: String,
    /// Full handle, kept for the tooltip.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: u64,
    pub to: u64,
    pub var_from: String,
    pub var_to: String,
}

#[derive(Debug, Default)]
pub struct GraphModel {
    /// handle -> local id; survives scope changes so a node keeps its id.
    ids: HashMap<String, u64>,
    nodes: Vec<GraphNode>,
    edge_keys: HashSet<String>,
    edges: Vec<GraphEdge>,
    values: BTreeMap<String, String>,
    time: Option<u64>,
    clock_paused: bool,
}

impl GraphModel {
    pub fn apply(&mut self, update: &VizUpdate) {
        match update {
            VizUpdate::Hierarchy(children) => self.set_hierarchy(children),
            VizUpdate::ConnectionTo(edges) | VizUpdate::ConnectionFrom(edges) => {
                self.add_edges(edges)
            }
            VizUpdate::Value(value) => {
                self.values.insert(value.handle.clone(), value.value.clone());
            }
            VizUpdate::Time(time) => self.time = Some(*time),
            VizUpdate::ClockPaused(clock) => {
                self.clock_paused = true;
                self.time = Some(clock.time);
                for (handle, value) in &clock.value {
                    self.values.insert(handle.clone(), value.clone());
                }
            }
        }
    }

    /// Entering a scope replaces the visible node set; ids persist so a
    /// node that reappears keeps its identity.
    fn set_hierarchy(&mut self, children: &[String]) {
        self.nodes.clear();
        self.edges.clear();
        self.edge_keys.clear();
        self.clock_paused = false;
        let mut shown = HashSet::new();
        for name in children {
            let id = self.id_for(name);
            if shown.insert(id) {
                self.nodes.push(node(id, name));
            }
        }
    }

    fn add_edges(&mut self, edges: &[ConnectionEdge]) {
        for edge in edges {
            if !self.edge_keys.insert(edge.key()) {
                continue;
            }
            let from = self.ensure_node(&edge.handle_from);
            let to = self.ensure_node(&edge.handle_to);
            self.edges.push(GraphEdge {
                from,
                to,
                var_from: edge.var_from.clone(),
                var_to: edge.var_to.clone(),
            });
        }
    }

    fn id_for(&mut self, name: &str) -> u64 {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.ids.len() as u64;
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Connections can surface nodes outside the current hierarchy list.
    fn ensure_node(&mut self, name: &str) -> u64 {
        let id = self.id_for(name);
        if !self.nodes.iter().any(|node| node.id == id) {
            self.nodes.push(node(id, name));
        }
        id
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn time(&self) -> Option<u64> {
        self.time
    }

    pub fn clock_paused(&self) -> bool {
        self.clock_paused
    }

    pub fn value_of(&self, handle: &str) -> Option<&str> {
        self.values.get(handle).map(String::as_str)
    }
}

fn node(id: u64, name: &str) -> GraphNode {
    let label = name.rsplit('.').next().unwrap_or(name).to_string();
    GraphNode {
        id,
        label,
        title: name.to_string(),
    }
}
