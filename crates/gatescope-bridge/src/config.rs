//! Launch-time connection parameters.

use std::path::PathBuf;

use serde::Deserialize;

use crate::remap::PathMap;

fn default_ip() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8888
}

/// Connection parameters supplied by the client's launch configuration.
///
/// Field names follow the launch.json contract of the front-end, hence
/// camelCase on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Path to the debug database produced alongside the generated design.
    pub database: PathBuf,
    /// Address of the simulator's control port.
    #[serde(default = "default_ip")]
    pub runtime_ip: String,
    #[serde(default = "default_port")]
    pub runtime_port: u16,
    #[serde(default)]
    pub stop_on_entry: bool,
    /// Local source root, for remote debugging.
    #[serde(default)]
    pub src_path: Option<String>,
    /// Simulator-side source root, for remote debugging.
    #[serde(default)]
    pub dst_path: Option<String>,
}

impl BridgeConfig {
    pub fn path_map(&self) -> PathMap {
        PathMap::new(self.src_path.clone(), self.dst_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_arguments_parse_with_defaults() {
        let config: BridgeConfig = serde_json::from_value(serde_json::json!({
            "database": "/work/debug.db"
        }))
        .expect("minimal config should parse");

        assert_eq!(config.runtime_ip, "localhost");
        assert_eq!(config.runtime_port, 8888);
        assert!(!config.stop_on_entry);
    }

    #[test]
    fn launch_arguments_accept_remote_mapping() {
        let config: BridgeConfig = serde_json::from_value(serde_json::json!({
            "database": "/work/debug.db",
            "runtimeIp": "10.0.0.5",
            "runtimePort": 9000,
            "stopOnEntry": true,
            "srcPath": "/home/user/design",
            "dstPath": "/mnt/build/design"
        }))
        .expect("full config should parse");

        assert_eq!(config.runtime_ip, "10.0.0.5");
        assert_eq!(config.runtime_port, 9000);
        assert!(config.stop_on_entry);
        assert_eq!(
            config.path_map().to_editor("/mnt/build/design/top.py"),
            "/home/user/design/top.py"
        );
    }
}
