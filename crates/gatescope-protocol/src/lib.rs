//! Gatescope wire protocol.
//!
//! Types exchanged with the simulator (HTTP control calls and push
//! callbacks) and with the visualization webview (message envelope).

pub mod sim;
pub mod viz;

pub use sim::{
    BreakpointReply, BreakpointRequest, ClockPayload, ConnectRequest, ConnectionEdge,
    ContextFrame, HierarchyReply, ScopeFrame, StopPayload, ValuePayload, ROOT_SCOPE,
};
pub use viz::{VizRequest, VizUpdate};
