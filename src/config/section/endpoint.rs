//! `[endpoint]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [endpoint]
//! server_id = "HotspecServer"
//! client_id = "HotspecPreprocessor"
//! socket_root = "/tmp"
//! appspace = "app."
//! transport = "unix"
//! ```
//!
//! The broker listens on `<socket_root>/<appspace><server_id>`.
//! With `transport = "tcp"` it listens on `127.0.0.1:<port>` instead.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Local channel endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Broker endpoint id.
    pub server_id: String,

    /// Requester endpoint id, sent with every request.
    pub client_id: String,

    /// Directory holding the socket file. Default: system temp dir.
    pub socket_root: Option<PathBuf>,

    /// Prefix of the socket file name.
    pub appspace: String,

    /// Socket kind.
    pub transport: Transport,

    /// Loopback port for `transport = "tcp"`.
    pub port: u16,
}

impl EndpointConfig {
    /// Absolute socket file path.
    pub fn socket_path(&self) -> PathBuf {
        let root = self.socket_root.clone().unwrap_or_else(std::env::temp_dir);
        root.join(format!("{}{}", self.appspace, self.server_id))
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            server_id: "HotspecServer".into(),
            client_id: "HotspecPreprocessor".into(),
            socket_root: None,
            appspace: "app.".into(),
            transport: Transport::default(),
            port: 5290,
        }
    }
}

/// Channel transport kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Unix domain socket (falls back to tcp where unsupported).
    Unix,
    /// Loopback TCP.
    Tcp,
}

impl Default for Transport {
    fn default() -> Self {
        if cfg!(unix) { Self::Unix } else { Self::Tcp }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_endpoint_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.endpoint.server_id, "HotspecServer");
        assert_eq!(config.endpoint.client_id, "HotspecPreprocessor");
        assert_eq!(config.endpoint.port, 5290);
        assert!(
            config
                .endpoint
                .socket_path()
                .ends_with("app.HotspecServer")
        );
    }

    #[test]
    fn test_socket_path() {
        let config = test_parse_config(
            "[endpoint]\nsocket_root = \"/run/hotspec\"\nappspace = \"dev.\"\nserver_id = \"Broker\"",
        );
        assert_eq!(
            config.endpoint.socket_path(),
            PathBuf::from("/run/hotspec/dev.Broker")
        );
    }

    #[test]
    fn test_transport_tcp() {
        let config = test_parse_config("[endpoint]\ntransport = \"tcp\"\nport = 7000");
        assert_eq!(config.endpoint.transport, Transport::Tcp);
        assert_eq!(config.endpoint.port, 7000);
    }
}
