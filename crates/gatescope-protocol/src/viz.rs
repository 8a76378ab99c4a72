//! The `{command, value}` envelope spoken over the webview message pump.

use serde::{Deserialize, Serialize};

use crate::sim::{ClockPayload, ConnectionEdge, ValuePayload};

/// Commands sent by the webview to the view controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "kebab-case")]
pub enum VizRequest {
    /// Navigate to a hierarchy scope (the root scope is `"$"`).
    Hierarchy(String),
    AddMonitor(String),
    RemoveMonitor(String),
    PauseOnClock(bool),
    Continue,
}

/// Updates pushed from the view controller to the webview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "kebab-case")]
pub enum VizUpdate {
    /// Fully qualified child handles of the scope just entered.
    Hierarchy(Vec<String>),
    ConnectionTo(Vec<ConnectionEdge>),
    ConnectionFrom(Vec<ConnectionEdge>),
    Value(ValuePayload),
    Time(u64),
    ClockPaused(ClockPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_matches_webview_wire_format() {
        let msg = VizRequest::Hierarchy("$".to_string());
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"command": "hierarchy", "value": "$"})
        );

        let parsed: VizRequest =
            serde_json::from_value(serde_json::json!({"command": "pause-on-clock", "value": true}))
                .expect("deserialize");
        assert_eq!(parsed, VizRequest::PauseOnClock(true));
    }

    #[test]
    fn update_envelope_uses_kebab_case_commands() {
        let msg = VizUpdate::ClockPaused(ClockPayload {
            time: 100,
            value: Default::default(),
        });
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["command"], "clock-paused");
        assert_eq!(json["value"]["time"], 100);
    }
}
