//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enable = true
//! roots = ["tests/support", "tests/integration"]
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Filesystem watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Recompile cached entries on change and send rerun notifications.
    pub enable: bool,

    /// Directories watched recursively (relative to project root).
    pub roots: Vec<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enable: true,
            roots: vec![
                PathBuf::from("tests/support"),
                PathBuf::from("tests/integration"),
            ],
        }
    }
}
