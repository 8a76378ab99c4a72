//! Gatescope inspector library.
//!
//! Serves the circuit-visualization webview: hierarchy navigation,
//! connection discovery with live-value monitors, and the node/edge graph
//! model behind the rendered view.

pub mod graph;
pub mod server;
pub mod view;

pub use graph::GraphModel;
pub use server::{run_view, InspectorState};
pub use view::HierarchyView;
