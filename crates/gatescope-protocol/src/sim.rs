//! Payloads for the simulator's control port and callback pushes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved handle naming the root of the design hierarchy.
pub const ROOT_SCOPE: &str = "$";

/// Variables visible at one nesting depth of a paused instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFrame {
    #[serde(default)]
    pub local: BTreeMap<String, String>,
    #[serde(default)]
    pub generator: BTreeMap<String, String>,
}

/// Pushed by the simulator when execution pauses on a breakpoint, a step
/// boundary, or an exception.
///
/// `local` and `generator` are parallel arrays, one map per nested scope
/// depth, outermost first. The shorter side is padded when zipping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopPayload {
    /// Server-side breakpoint id, when the pause was caused by one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub instance_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    /// Path as seen from the simulator's filesystem.
    pub filename: String,
    pub line_num: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_num: Option<u64>,
    #[serde(default)]
    pub local: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub generator: Vec<BTreeMap<String, String>>,
}

impl StopPayload {
    /// Zip the parallel depth arrays into scope frames.
    pub fn scope_frames(&self) -> Vec<ScopeFrame> {
        let depth = self.local.len().max(self.generator.len());
        (0..depth)
            .map(|i| ScopeFrame {
                local: self.local.get(i).cloned().unwrap_or_default(),
                generator: self.generator.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Pushed when the simulator pauses on a clock edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockPayload {
    pub time: u64,
    /// Monitored handle values sampled at the edge.
    #[serde(default)]
    pub value: BTreeMap<String, String>,
}

/// A single monitored-value update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePayload {
    pub handle: String,
    pub value: String,
}

/// Body of the `connect` call that registers our callback listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub ip: String,
    pub port: u16,
    /// Path to the debug database the simulator should load.
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_path: Option<String>,
}

/// Body of breakpoint insertion/removal calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointRequest {
    pub filename: String,
    pub line_num: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_num: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

/// The simulator's answer to a breakpoint insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointReply {
    /// Server-side id; distinct requests resolving to the same physical
    /// location receive the same id.
    pub id: u64,
}

/// One instance's frames as returned by a context query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextFrame {
    pub instance_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(default)]
    pub local: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub generator: Vec<BTreeMap<String, String>>,
}

impl ContextFrame {
    pub fn scope_frames(&self) -> Vec<ScopeFrame> {
        let depth = self.local.len().max(self.generator.len());
        (0..depth)
            .map(|i| ScopeFrame {
                local: self.local.get(i).cloned().unwrap_or_default(),
                generator: self.generator.get(i).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

/// Flattened children of one hierarchy scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyReply {
    /// Fully qualified handles directly under the queried scope.
    #[serde(default)]
    pub children: Vec<String>,
    /// Current values, when the scope carries signals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeMap<String, String>>,
}

/// One directed wire reported by a connection query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    pub handle_from: String,
    pub var_from: String,
    pub handle_to: String,
    pub var_to: String,
}

impl ConnectionEdge {
    /// Canonical dedup key. The same wire may be reported by both the
    /// "to" and "from" queries of its two endpoints.
    pub fn key(&self) -> String {
        format!(
            "{}.{}->{}.{}",
            self.handle_from, self.var_from, self.handle_to, self.var_to
        )
    }

    /// Fully qualified signal on the driving side, the one worth
    /// monitoring for live values.
    pub fn driver(&self) -> String {
        format!("{}.{}", self.handle_from, self.var_from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_payload_zips_uneven_depths() {
        let payload: StopPayload = serde_json::from_value(serde_json::json!({
            "id": 4,
            "instance_id": 2,
            "filename": "/design/top.py",
            "line_num": 42,
            "local": [{"a": "1"}, {"b": "2"}],
            "generator": [{"clk": "0"}]
        }))
        .expect("payload should deserialize");

        let frames = payload.scope_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].local.get("a").map(String::as_str), Some("1"));
        assert_eq!(frames[0].generator.get("clk").map(String::as_str), Some("0"));
        assert!(frames[1].generator.is_empty());
    }

    #[test]
    fn connection_edge_key_is_direction_sensitive() {
        let forward = ConnectionEdge {
            handle_from: "top.a".into(),
            var_from: "out".into(),
            handle_to: "top.b".into(),
            var_to: "in".into(),
        };
        let mut reverse = forward.clone();
        std::mem::swap(&mut reverse.handle_from, &mut reverse.handle_to);
        std::mem::swap(&mut reverse.var_from, &mut reverse.var_to);

        assert_ne!(forward.key(), reverse.key());
        assert_eq!(forward.driver(), "top.a.out");
    }
}
