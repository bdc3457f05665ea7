//! `[startup]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [startup]
//! support_file = "tests/support/index.js"
//! changed_roots = ["tests/integration"]
//! eager_limit = 10
//! ```
//!
//! At start the broker compiles `support_file` and up to `eager_limit`
//! files changed since the parent commit under `changed_roots`. The rest
//! compile on first request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Startup warm-up settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Entry compiled at every start (relative to project root).
    pub support_file: PathBuf,

    /// Roots scanned for changed files (relative to project root).
    pub changed_roots: Vec<PathBuf>,

    /// Maximum number of changed files compiled eagerly.
    pub eager_limit: usize,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            support_file: PathBuf::from("tests/support/index.js"),
            changed_roots: vec![PathBuf::from("tests/integration")],
            eager_limit: 10,
        }
    }
}
