//! `[client]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [client]
//! request_timeout_ms = 120000   # 0 waits forever
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Requester settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Give up on a compile request after this many milliseconds.
    /// `0` disables the deadline.
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    /// Request deadline, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 120_000,
        }
    }
}
