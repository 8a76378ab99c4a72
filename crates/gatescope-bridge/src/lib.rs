//! Simulator bridge.
//!
//! The only crate that talks to the simulator process: outbound control
//! calls over HTTP and an inbound callback listener for pushed events.
//! Consumers receive pushes as typed [`SimEvent`]s over a channel instead
//! of registering global listeners.

pub mod callback;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod net;
pub mod remap;

pub use callback::CallbackServer;
pub use client::SimClient;
pub use config::BridgeConfig;
pub use db::DebugDb;
pub use error::{Error, Result};
pub use events::{SimEvent, StopCause};
pub use remap::PathMap;
