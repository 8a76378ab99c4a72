//! Frame snapshots, handle encoding, and variable grouping.
//!
//! The protocol addresses stack frames with a single integer, but the
//! simulator exposes a two-dimensional (instance x depth) space. A frame
//! handle packs both into one integer: 13 low bits of depth, 39 bits of
//! instance id. 39 + 13 = 52 keeps every handle inside the range a JSON
//! double can represent exactly.

use std::collections::{BTreeMap, HashMap, HashSet};

use gatescope_protocol::{ContextFrame, ScopeFrame, StopPayload};
use thiserror::Error;

pub const STACK_INDEX_BITS: u32 = 13;
pub const MAX_STACK_INDEX: u64 = 1 << STACK_INDEX_BITS;
pub const MAX_INSTANCE_ID: u64 = 1 << 39;

/// First protocol-visible variable reference; lower values are reserved.
const FIRST_VARIABLE_REF: i64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    #[error("stack index {0} exceeds the 8191-frame encoding limit")]
    StackIndexTooLarge(u64),

    #[error("instance id {0} exceeds the 39-bit encoding limit")]
    InstanceIdTooLarge(u64),

    #[error("malformed frame handle {0}")]
    Malformed(i64),
}

/// An (instance, depth) pair addressable through one protocol integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    pub instance_id: u64,
    pub stack_index: u64,
}

impl FrameHandle {
    pub fn new(instance_id: u64, stack_index: u64) -> Self {
        Self {
            instance_id,
            stack_index,
        }
    }

    /// Pack into a protocol integer, validating both fields.
    pub fn encode(self) -> Result<i64, HandleError> {
        if self.stack_index >= MAX_STACK_INDEX {
            return Err(HandleError::StackIndexTooLarge(self.stack_index));
        }
        if self.instance_id >= MAX_INSTANCE_ID {
            return Err(HandleError::InstanceIdTooLarge(self.instance_id));
        }
        Ok(((self.instance_id << STACK_INDEX_BITS) | self.stack_index) as i64)
    }

    /// Invert [`encode`](Self::encode).
    pub fn decode(raw: i64) -> Result<Self, HandleError> {
        if raw < 0 {
            return Err(HandleError::Malformed(raw));
        }
        let bits = raw as u64;
        let instance_id = bits >> STACK_INDEX_BITS;
        if instance_id >= MAX_INSTANCE_ID {
            return Err(HandleError::Malformed(raw));
        }
        Ok(Self {
            instance_id,
            stack_index: bits & (MAX_STACK_INDEX - 1),
        })
    }
}

/// The variable-visibility bucket a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Local,
    Generator,
    Global,
}

/// What a variables reference resolves to.
///
/// A structured key instead of the string-encoded composites the protocol
/// invites; nothing ever parses these back out of a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableKey {
    Scope {
        kind: ScopeKind,
        instance_id: u64,
        stack_index: u64,
    },
    /// A nested-member drill-down below a scope, e.g. `mem` or `mem.bank0`.
    Member {
        kind: ScopeKind,
        instance_id: u64,
        stack_index: u64,
        prefix: String,
    },
}

/// Allocates protocol-visible integer references for variable queries.
///
/// Reset on every stop; references handed out before a stop then resolve
/// to nothing and the request degrades to an empty result.
#[derive(Debug)]
pub struct HandlePool {
    next: i64,
    by_ref: HashMap<i64, VariableKey>,
    by_key: HashMap<VariableKey, i64>,
}

impl Default for HandlePool {
    fn default() -> Self {
        Self {
            next: FIRST_VARIABLE_REF,
            by_ref: HashMap::new(),
            by_key: HashMap::new(),
        }
    }
}

impl HandlePool {
    pub fn intern(&mut self, key: VariableKey) -> i64 {
        if let Some(existing) = self.by_key.get(&key) {
            return *existing;
        }
        let reference = self.next;
        self.next += 1;
        self.by_ref.insert(reference, key.clone());
        self.by_key.insert(key, reference);
        reference
    }

    pub fn get(&self, reference: i64) -> Option<&VariableKey> {
        self.by_ref.get(&reference)
    }

    pub fn reset(&mut self) {
        self.next = FIRST_VARIABLE_REF;
        self.by_ref.clear();
        self.by_key.clear();
    }
}

/// Everything known about one paused instance.
#[derive(Debug, Clone)]
pub struct InstanceSnapshot {
    pub instance_id: u64,
    pub name: Option<String>,
    /// Editor-side path of the stop location.
    pub filename: String,
    pub line: u64,
    pub column: Option<u64>,
    /// One entry per nested scope depth, outermost first.
    pub frames: Vec<ScopeFrame>,
}

impl InstanceSnapshot {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("instance {}", self.instance_id))
    }
}

/// Last-received snapshot of per-instance scope frames.
///
/// Mirrors the simulator's most recent push: a stop event replaces the
/// whole store, a context refinement only touches the instances it names.
#[derive(Debug, Default)]
pub struct FrameStore {
    instances: BTreeMap<u64, InstanceSnapshot>,
}

impl FrameStore {
    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Full replacement on a stop push.
    pub fn apply_stop(&mut self, payload: &StopPayload, editor_filename: String) {
        self.instances.clear();
        self.instances.insert(
            payload.instance_id,
            InstanceSnapshot {
                instance_id: payload.instance_id,
                name: payload.instance_name.clone(),
                filename: editor_filename,
                line: payload.line_num,
                column: payload.column_num,
                frames: payload.scope_frames(),
            },
        );
    }

    /// Per-instance refinement from a context query; instances not named
    /// in the reply keep their snapshots.
    pub fn apply_context(
        &mut self,
        frames: &[ContextFrame],
        editor_filename: &str,
        line: u64,
    ) {
        for frame in frames {
            self.instances.insert(
                frame.instance_id,
                InstanceSnapshot {
                    instance_id: frame.instance_id,
                    name: frame.instance_name.clone(),
                    filename: editor_filename.to_string(),
                    line,
                    column: None,
                    frames: frame.scope_frames(),
                },
            );
        }
    }

    pub fn instance_ids(&self) -> Vec<u64> {
        self.instances.keys().copied().collect()
    }

    pub fn get(&self, instance_id: u64) -> Option<&InstanceSnapshot> {
        self.instances.get(&instance_id)
    }

    pub fn scope_frame(&self, instance_id: u64, stack_index: u64) -> Option<&ScopeFrame> {
        self.instances
            .get(&instance_id)
            .and_then(|snap| snap.frames.get(stack_index as usize))
    }
}

/// One row of a variables response before protocol conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    /// Display name; numeric path segments render as `[n]`.
    pub name: String,
    /// Present for scalars, absent for synthesized containers.
    pub value: Option<String>,
    /// Full member prefix a drill-down query should use.
    pub container_prefix: Option<String>,
}

/// Group dotted variable names one level at a time.
///
/// Names sharing a first segment collapse into a single container entry;
/// the remaining suffix is resolved on the recursive query for that
/// container's prefix.
pub fn group_variables(
    vars: &BTreeMap<String, String>,
    prefix: Option<&str>,
) -> Vec<VariableEntry> {
    let mut entries = Vec::new();
    let mut containers = HashSet::new();

    for (name, value) in vars {
        let suffix = match prefix {
            Some(p) => {
                let Some(rest) = name.strip_prefix(p).and_then(|r| r.strip_prefix('.')) else {
                    continue;
                };
                rest
            }
            None => name.as_str(),
        };
        match suffix.split_once('.') {
            Some((head, _)) => {
                if containers.insert(head.to_string()) {
                    let full = match prefix {
                        Some(p) => format!("{p}.{head}"),
                        None => head.to_string(),
                    };
                    entries.push(VariableEntry {
                        name: display_segment(head),
                        value: None,
                        container_prefix: Some(full),
                    });
                }
            }
            None => entries.push(VariableEntry {
                name: display_segment(suffix),
                value: Some(value.clone()),
                container_prefix: None,
            }),
        }
    }

    entries
}

/// Numeric segments are array indices; render them with brackets.
fn display_segment(segment: &str) -> String {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        format!("[{segment}]")
    } else {
        segment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_round_trips_across_the_full_range() {
        let instances = [0u64, 1, 42, 8191, 8192, (1 << 20) + 7, (1 << 39) - 1];
        let depths = [0u64, 1, 12, 8190, 8191];
        for &instance_id in &instances {
            for &stack_index in &depths {
                let handle = FrameHandle::new(instance_id, stack_index);
                let raw = handle.encode().expect("in-range handle must encode");
                assert_eq!(FrameHandle::decode(raw), Ok(handle));
            }
        }
    }

    #[test]
    fn handle_rejects_out_of_range_values() {
        assert_eq!(
            FrameHandle::new(1, 8192).encode(),
            Err(HandleError::StackIndexTooLarge(8192))
        );
        assert_eq!(
            FrameHandle::new(1 << 39, 0).encode(),
            Err(HandleError::InstanceIdTooLarge(1 << 39))
        );
        assert_eq!(FrameHandle::decode(-3), Err(HandleError::Malformed(-3)));
    }

    #[test]
    fn stop_replaces_previous_snapshot_entirely() {
        let mut store = FrameStore::default();

        let first: StopPayload = serde_json::from_value(serde_json::json!({
            "instance_id": 3,
            "filename": "/d/top.py",
            "line_num": 10,
            "local": [{"a": "1"}, {"b": "2"}]
        }))
        .expect("payload");
        store.apply_stop(&first, "/d/top.py".to_string());
        assert_eq!(store.get(3).map(|s| s.frames.len()), Some(2));

        let second: StopPayload = serde_json::from_value(serde_json::json!({
            "instance_id": 3,
            "filename": "/d/top.py",
            "line_num": 11,
            "local": [{"a": "2"}]
        }))
        .expect("payload");
        store.apply_stop(&second, "/d/top.py".to_string());

        let snap = store.get(3).expect("instance 3");
        assert_eq!(snap.frames.len(), 1, "stop must replace, not append");
        assert_eq!(snap.line, 11);
    }

    #[test]
    fn context_refines_without_clearing_other_instances() {
        let mut store = FrameStore::default();
        let stop: StopPayload = serde_json::from_value(serde_json::json!({
            "instance_id": 1,
            "filename": "/d/top.py",
            "line_num": 5,
            "local": [{"x": "0"}]
        }))
        .expect("payload");
        store.apply_stop(&stop, "/d/top.py".to_string());

        let refinement: Vec<ContextFrame> = serde_json::from_value(serde_json::json!([
            {"instance_id": 2, "local": [{"y": "9"}]}
        ]))
        .expect("frames");
        store.apply_context(&refinement, "/d/top.py", 5);

        assert_eq!(store.instance_ids(), vec![1, 2]);
        assert_eq!(store.get(1).map(|s| s.frames.len()), Some(1));
    }

    #[test]
    fn groups_nested_names_into_containers() {
        let vars = BTreeMap::from([
            ("mem.a".to_string(), "1".to_string()),
            ("mem.b".to_string(), "2".to_string()),
            ("flag".to_string(), "0".to_string()),
        ]);

        let top = group_variables(&vars, None);
        assert_eq!(top.len(), 2);
        let container = top
            .iter()
            .find(|e| e.container_prefix.is_some())
            .expect("container for mem");
        assert_eq!(container.name, "mem");
        assert_eq!(container.container_prefix.as_deref(), Some("mem"));
        let scalar = top.iter().find(|e| e.value.is_some()).expect("flag entry");
        assert_eq!(scalar.name, "flag");

        let nested = group_variables(&vars, Some("mem"));
        let names: Vec<&str> = nested.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(nested.iter().all(|e| e.value.is_some()));
    }

    #[test]
    fn numeric_segments_render_as_indices() {
        let vars = BTreeMap::from([
            ("bank.0.data".to_string(), "7".to_string()),
            ("bank.1.data".to_string(), "8".to_string()),
        ]);

        let under_bank = group_variables(&vars, Some("bank"));
        let names: Vec<&str> = under_bank.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["[0]", "[1]"]);
        assert_eq!(under_bank[0].container_prefix.as_deref(), Some("bank.0"));
    }

    #[test]
    fn handle_pool_interns_and_resets() {
        let mut pool = HandlePool::default();
        let key = VariableKey::Scope {
            kind: ScopeKind::Local,
            instance_id: 1,
            stack_index: 0,
        };
        let reference = pool.intern(key.clone());
        assert_eq!(reference, 1000);
        assert_eq!(pool.intern(key.clone()), reference, "interning is idempotent");
        assert_eq!(pool.get(reference), Some(&key));

        pool.reset();
        assert_eq!(pool.get(reference), None);
    }
}
